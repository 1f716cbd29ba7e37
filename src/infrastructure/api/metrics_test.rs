use anyhow::Result;
use serde_json::json;

use crate::infrastructure::api::AgentD;

#[tokio::test]
async fn it_gets_system_metrics() -> Result<()> {
    let body = json!({"cpu_percent": 12.5, "memory": {"percent": 48.1}, "disk": {"percent": 71.0}});

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/system-metrics")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    let res = backend.system_metrics().await?;

    mock.assert();
    assert_eq!(res, body);

    return Ok(());
}

#[tokio::test]
async fn it_gets_historical_metrics() -> Result<()> {
    let body = json!({"metrics": [{"timestamp": "2024-01-01T12:00:00", "cpu_percent": 3.0}], "time_range": "1h"});

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/historical-metrics/1h")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    let res = backend.historical_metrics("1h").await?;

    mock.assert();
    assert_eq!(res["time_range"], "1h");
    assert_eq!(res["metrics"].as_array().map(|e| return e.len()), Some(1));

    return Ok(());
}

#[tokio::test]
async fn it_times_out_slow_requests() {
    let backend = AgentD::new("http://10.255.255.1", "50");
    let res = backend.system_metrics().await;

    assert!(res.is_err());
}
