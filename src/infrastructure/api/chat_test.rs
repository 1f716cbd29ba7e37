use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use test_utils::chat_stream_fixture;
use tokio::sync::mpsc;

use crate::domain::models::AgentExecutor;
use crate::domain::models::Progress;
use crate::domain::models::SendOutcome;
use crate::infrastructure::api::AgentD;

fn drain(rx: &mut mpsc::UnboundedReceiver<Progress>) -> Vec<Progress> {
    let mut items = vec![];
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    return items;
}

#[tokio::test]
async fn it_streams_a_reply() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::Json(json!({"session_id": "s1", "message": "hello"})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(chat_stream_fixture())
        .create();

    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let backend = AgentD::new(&server.url(), "1000");
    let outcome = backend.send("s1", "hello", &tx).await?;

    mock.assert();
    assert_eq!(
        outcome,
        SendOutcome::Reply {
            assistant_text: "hi there".to_string()
        }
    );

    let progress = drain(&mut rx);
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].message, "thinking");
    assert_eq!(progress[0].percent(), 50);
    assert_eq!(progress[1].message, "drafting");
    assert_eq!(progress[1].percent(), 100);

    return Ok(());
}

#[tokio::test]
async fn it_returns_agent_errors_as_an_outcome() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body("data: {\"type\": \"error\", \"message\": \"rate limited\"}\n\n")
        .create();

    let (tx, _rx) = mpsc::unbounded_channel::<Progress>();
    let backend = AgentD::new(&server.url(), "1000");
    let outcome = backend.send("s1", "hello", &tx).await?;

    mock.assert();
    assert_eq!(
        outcome,
        SendOutcome::Failed {
            error_text: "rate limited".to_string()
        }
    );

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_a_non_success_status() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/api/chat").with_status(502).create();

    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let backend = AgentD::new(&server.url(), "1000");
    let res = backend.send("s1", "hello", &tx).await;

    mock.assert();
    insta::assert_snapshot!(res.unwrap_err().to_string(), @"Chat request failed with status 502");
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn it_fails_when_the_backend_is_unreachable() {
    let (tx, _rx) = mpsc::unbounded_channel::<Progress>();
    let backend = AgentD::new("http://127.0.0.1:1", "1000");
    let res = backend.send("s1", "hello", &tx).await;

    assert!(res.is_err());
}
