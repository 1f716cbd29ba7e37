#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;

use super::stream::run_exchange;
use crate::domain::models::AgentExecutorBox;
use crate::domain::models::AgentTask;
use crate::domain::models::Event;
use crate::domain::models::NewSession;
use crate::domain::models::Progress;
use crate::domain::models::SendOutcome;
use crate::domain::models::SessionStoreBox;
use crate::domain::models::TaskStatus;
use crate::domain::models::AGENT_TASK_TITLE_PREFIX;

/// Runs saved agent tasks, each in a fresh agent session.
pub struct TaskRunner {
    store: SessionStoreBox,
    executor: AgentExecutorBox,
    tx: mpsc::UnboundedSender<Event>,
    progress_tx: Option<mpsc::UnboundedSender<Progress>>,
}

impl TaskRunner {
    pub fn new(
        store: SessionStoreBox,
        executor: AgentExecutorBox,
        tx: mpsc::UnboundedSender<Event>,
    ) -> TaskRunner {
        return TaskRunner {
            store,
            executor,
            tx,
            progress_tx: None,
        };
    }

    /// Forwards progress of running tasks to `progress_tx`.
    pub fn with_progress(mut self, progress_tx: mpsc::UnboundedSender<Progress>) -> TaskRunner {
        self.progress_tx = Some(progress_tx);
        return self;
    }

    fn notify(&self, task: &AgentTask) {
        if self.tx.send(Event::TaskUpdated(task.clone())).is_err() {
            tracing::trace!("No subscriber for task updates");
        }
    }

    /// Runs a task to completion and returns it with its final status and
    /// result. Failures end up in `last_result`; they are never raised.
    pub async fn run(&self, task: &AgentTask) -> AgentTask {
        let mut current = task.clone();
        current.status = TaskStatus::Running;
        self.notify(&current);

        match self.execute(task).await {
            Ok(SendOutcome::Reply { assistant_text }) => {
                current.status = TaskStatus::Completed;
                current.last_result = Some(assistant_text);
            }
            Ok(SendOutcome::Failed { error_text }) => {
                current.status = TaskStatus::Failed;
                current.last_result = Some(error_text);
            }
            Err(err) => {
                tracing::error!(error = ?err, task_id = %task.id, "Agent task failed");
                current.status = TaskStatus::Failed;
                current.last_result = Some(err.to_string());
            }
        }

        tracing::debug!(task_id = %current.id, status = %current.status, "Agent task finished");
        self.notify(&current);

        return current;
    }

    async fn execute(&self, task: &AgentTask) -> Result<SendOutcome> {
        let session = self
            .store
            .create_session(&NewSession {
                id: format!("agent_{}", Utc::now().timestamp_millis()),
                title: format!("{AGENT_TASK_TITLE_PREFIX}{}", task.name),
            })
            .await?;

        let progress_tx = self.progress_tx.clone();
        return run_exchange(&self.executor, &session.id, &task.task, move |progress| {
            if let Some(tx) = &progress_tx {
                if tx.send(progress).is_err() {
                    tracing::trace!("Task progress receiver dropped");
                }
            }
            return std::future::ready(());
        })
        .await;
    }
}
