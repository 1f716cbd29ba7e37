use anyhow::Result;
use mockito::Matcher;
use serde_json::json;

use crate::domain::models::TaskDraft;
use crate::domain::models::TaskStatus;
use crate::infrastructure::api::AgentD;

#[tokio::test]
async fn it_lists_tasks() -> Result<()> {
    let body = json!({
        "tasks": [
            {
                "id": "task_1704110400000",
                "name": "Digest",
                "description": null,
                "task": "Summarize my inbox",
                "created_at": "2024-01-01T12:00:00",
                "last_result": "3 unread emails"
            },
            {
                "id": "task_1704110300000",
                "name": "Backup",
                "description": "Nightly",
                "task": "Back up the notes folder",
                "created_at": "2024-01-01T11:58:20",
                "last_result": null,
                "status": "running"
            }
        ]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/agent_tasks")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    let tasks = backend.list_tasks().await?;

    mock.assert();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].name, "Digest");
    assert_eq!(tasks[0].description, "");
    assert_eq!(tasks[0].last_result, Some("3 unread emails".to_string()));
    assert_eq!(tasks[0].status, TaskStatus::Idle);
    assert_eq!(tasks[1].status, TaskStatus::Running);
    assert_eq!(tasks[1].last_result, None);

    return Ok(());
}

#[tokio::test]
async fn it_creates_tasks() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/agent_tasks")
        .match_body(Matcher::Json(json!({
            "name": "Digest",
            "description": "",
            "task": "Summarize my inbox"
        })))
        .with_status(200)
        .with_body(
            json!({
                "id": "task_1704110400000",
                "name": "Digest",
                "description": "",
                "task": "Summarize my inbox",
                "created_at": "2024-01-01T12:00:00",
                "last_result": null,
                "status": "idle"
            })
            .to_string(),
        )
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    let task = backend
        .create_task(&TaskDraft::new(" Digest ", "", "Summarize my inbox\n"))
        .await?;

    mock.assert();
    assert_eq!(task.id, "task_1704110400000");
    assert_eq!(task.status, TaskStatus::Idle);

    return Ok(());
}

#[tokio::test]
async fn it_rejects_incomplete_drafts_without_a_request() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/api/agent_tasks").expect(0).create();

    let backend = AgentD::new(&server.url(), "1000");
    let res = backend.create_task(&TaskDraft::new("Digest", "", "   ")).await;

    mock.assert();
    insta::assert_snapshot!(res.unwrap_err().to_string(), @"Configuration error: Name and task are required");
}

#[tokio::test]
async fn it_updates_tasks() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", "/api/agent_tasks/task_1")
        .match_body(Matcher::Json(json!({
            "name": "Digest",
            "description": "Weekdays only",
            "task": "Summarize my inbox"
        })))
        .with_status(200)
        .with_body(json!({"id": "task_1", "status": "updated"}).to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    backend
        .update_task(
            "task_1",
            &TaskDraft::new("Digest", "Weekdays only", "Summarize my inbox"),
        )
        .await?;

    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_fails_updating_a_missing_task() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", "/api/agent_tasks/nope")
        .with_status(404)
        .with_body(json!({"detail": "Task not found"}).to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    let res = backend
        .update_task("nope", &TaskDraft::new("Digest", "", "Summarize my inbox"))
        .await;

    mock.assert();
    insta::assert_snapshot!(res.unwrap_err().to_string(), @"Updating task failed with status 404: Task not found");
}

#[tokio::test]
async fn it_deletes_tasks() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/api/agent_tasks/task_1")
        .with_status(200)
        .with_body(json!({"status": "success", "message": "Task task_1 deleted"}).to_string())
        .create();

    let backend = AgentD::new(&server.url(), "1000");
    backend.delete_task("task_1").await?;

    mock.assert();

    return Ok(());
}
