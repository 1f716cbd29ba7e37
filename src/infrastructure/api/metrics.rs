#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;

use anyhow::Result;

use super::AgentD;

impl AgentD {
    pub async fn system_metrics(&self) -> Result<serde_json::Value> {
        return self
            .get_json::<serde_json::Value>("/api/system-metrics", "Loading system metrics")
            .await;
    }

    pub async fn historical_metrics(&self, range: &str) -> Result<serde_json::Value> {
        return self
            .get_json::<serde_json::Value>(
                &format!("/api/historical-metrics/{range}"),
                "Loading historical metrics",
            )
            .await;
    }
}
