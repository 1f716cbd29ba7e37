#[cfg(test)]
#[path = "task_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;

use super::ControllerError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// A saved automation task from the agent builder.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub task: String,
    pub created_at: DateTime<Utc>,
    pub last_result: Option<String>,
    pub status: TaskStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub task: String,
}

impl TaskDraft {
    pub fn new(name: &str, description: &str, task: &str) -> TaskDraft {
        return TaskDraft {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            task: task.trim().to_string(),
        };
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.name.is_empty() || self.task.is_empty() {
            return Err(ControllerError::Config(
                "Name and task are required".to_string(),
            ));
        }

        return Ok(());
    }
}
