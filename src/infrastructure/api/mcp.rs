#[cfg(test)]
#[path = "mcp_test.rs"]
mod tests;

use std::collections::BTreeMap;

use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ensure_success;
use super::AgentD;
use crate::domain::models::ControllerError;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct McpConfigRequest {
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, serde_json::Value>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ZapierConfig {
    #[serde(default)]
    url: String,
}

impl AgentD {
    pub async fn get_mcp_config(&self) -> Result<serde_json::Value> {
        return self
            .get_json::<serde_json::Value>("/api/mcp_config", "Loading MCP config")
            .await;
    }

    /// Registers one MCP server under `name`.
    pub async fn add_mcp_server(&self, name: &str, config: serde_json::Value) -> Result<()> {
        let req = McpConfigRequest {
            mcp_servers: BTreeMap::from([(name.to_string(), config)]),
        };

        let res = reqwest::Client::new()
            .post(self.endpoint("/api/mcp_config"))
            .timeout(self.timeout()?)
            .json(&req)
            .send()
            .await?;

        let res = ensure_success(res, "Saving MCP config")
            .await?
            .json::<StatusResponse>()
            .await?;

        if res.status != "success" {
            let reason = res.message.unwrap_or(res.status);
            tracing::error!(server = name, reason = %reason, "MCP server was not saved");
            return Err(ControllerError::Config(format!("MCP server {name} was not saved: {reason}")).into());
        }

        return Ok(());
    }

    pub async fn get_zapier_url(&self) -> Result<String> {
        let res = self
            .get_json::<ZapierConfig>("/api/zapier_mcp", "Loading Zapier config")
            .await?;

        return Ok(res.url);
    }

    /// Saves the Zapier MCP URL. The server rejects anything that is not a
    /// Zapier actions URL.
    pub async fn set_zapier_url(&self, url: &str) -> Result<String> {
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/zapier_mcp"))
            .timeout(self.timeout()?)
            .json(&ZapierConfig {
                url: url.trim().to_string(),
            })
            .send()
            .await?;

        let res = ensure_success(res, "Saving Zapier config")
            .await?
            .json::<ZapierConfig>()
            .await?;

        return Ok(res.url);
    }
}
