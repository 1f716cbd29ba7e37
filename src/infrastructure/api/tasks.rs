#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;

use std::str::FromStr;

use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ensure_success;
use super::AgentD;
use crate::domain::models::parse_timestamp_lenient;
use crate::domain::models::AgentTask;
use crate::domain::models::TaskDraft;
use crate::domain::models::TaskStatus;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TaskResponse {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    task: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    last_result: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl TaskResponse {
    fn into_task(self) -> AgentTask {
        let status = self
            .status
            .as_deref()
            .and_then(|e| return TaskStatus::from_str(e).ok())
            .unwrap_or_default();

        return AgentTask {
            id: self.id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            task: self.task,
            created_at: parse_timestamp_lenient(&self.created_at),
            last_result: self.last_result,
            status,
        };
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    tasks: Vec<TaskResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TaskRequest {
    name: String,
    description: String,
    task: String,
}

impl TaskRequest {
    fn from_draft(draft: &TaskDraft) -> TaskRequest {
        return TaskRequest {
            name: draft.name.to_string(),
            description: draft.description.to_string(),
            task: draft.task.to_string(),
        };
    }
}

impl AgentD {
    /// Saved tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<AgentTask>> {
        let res = self
            .get_json::<TaskListResponse>("/api/agent_tasks", "Listing tasks")
            .await?;

        return Ok(res.tasks.into_iter().map(|e| return e.into_task()).collect());
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<AgentTask> {
        draft.validate()?;

        let res = reqwest::Client::new()
            .post(self.endpoint("/api/agent_tasks"))
            .timeout(self.timeout()?)
            .json(&TaskRequest::from_draft(draft))
            .send()
            .await?;

        let task = ensure_success(res, "Creating task")
            .await?
            .json::<TaskResponse>()
            .await?
            .into_task();
        tracing::debug!(task_id = %task.id, "Task created");

        return Ok(task);
    }

    pub async fn update_task(&self, task_id: &str, draft: &TaskDraft) -> Result<()> {
        draft.validate()?;

        let res = reqwest::Client::new()
            .put(self.endpoint(&format!("/api/agent_tasks/{task_id}")))
            .timeout(self.timeout()?)
            .json(&TaskRequest::from_draft(draft))
            .send()
            .await?;

        ensure_success(res, "Updating task").await?;

        return Ok(());
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let res = reqwest::Client::new()
            .delete(self.endpoint(&format!("/api/agent_tasks/{task_id}")))
            .timeout(self.timeout()?)
            .send()
            .await?;

        ensure_success(res, "Deleting task").await?;

        return Ok(());
    }
}
