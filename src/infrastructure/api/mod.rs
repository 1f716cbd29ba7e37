pub mod chat;
pub mod mcp;
pub mod metrics;
pub mod sessions;
pub mod tasks;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use serde_derive::Deserialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

pub(crate) fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

/// HTTP client for the AgentD backend. Implements both the session store and
/// the agent executor, plus the task, MCP and metrics endpoints.
#[derive(Clone, Debug)]
pub struct AgentD {
    url: String,
    timeout: String,
}

impl Default for AgentD {
    fn default() -> AgentD {
        return AgentD {
            url: Config::get(ConfigKey::ApiURL),
            timeout: Config::get(ConfigKey::RequestTimeout),
        };
    }
}

impl AgentD {
    pub fn new(url: &str, timeout: &str) -> AgentD {
        return AgentD {
            url: url.trim_end_matches('/').to_string(),
            timeout: timeout.to_string(),
        };
    }

    fn endpoint(&self, path: &str) -> String {
        return format!("{url}{path}", url = self.url.trim_end_matches('/'));
    }

    fn timeout(&self) -> Result<Duration> {
        return Ok(Duration::from_millis(self.timeout.parse::<u64>()?));
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, action: &str) -> Result<T> {
        let res = reqwest::Client::new()
            .get(self.endpoint(path))
            .timeout(self.timeout()?)
            .send()
            .await?;

        return Ok(ensure_success(res, action).await?.json::<T>().await?);
    }
}

/// Fails with the server's `detail` when the response is not a 2xx.
pub(crate) async fn ensure_success(
    res: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(ErrorResponse {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) => body,
    };

    tracing::error!(status = status.as_u16(), detail = %detail, "{action} failed");
    if detail.is_empty() {
        bail!("{action} failed with status {}", status.as_u16());
    }
    bail!("{action} failed with status {}: {detail}", status.as_u16());
}
