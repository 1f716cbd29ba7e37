use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::mpsc;

use super::Message;
use super::Progress;
use super::Role;
use super::SendOutcome;
use super::Session;
use super::SessionKind;

/// Body of a session creation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSession {
    pub id: String,
    pub title: String,
}

/// A message as submitted to the store for persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageRecord {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(session_id: &str, message: &Message) -> MessageRecord {
        return MessageRecord {
            session_id: session_id.to_string(),
            role: message.role,
            content: message.content.to_string(),
            timestamp: message.timestamp,
        };
    }
}

#[async_trait]
pub trait SessionStore {
    /// Lists sessions of a kind. Returned sessions carry no messages.
    async fn list_sessions(&self, kind: SessionKind) -> Result<Vec<Session>>;

    /// Full message history of a session, oldest first.
    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    async fn create_session(&self, session: &NewSession) -> Result<Session>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn append_message(&self, record: &MessageRecord) -> Result<()>;
}

#[async_trait]
pub trait AgentExecutor {
    /// Submits a message to the agent and follows its event stream until a
    /// terminal event. Every progress event is passed through the channel in
    /// arrival order before this returns.
    ///
    /// Transport failures, including a non-2xx status, are returned as errors.
    /// An `error` event from the agent is a regular `SendOutcome::Failed`.
    async fn send<'a>(
        &self,
        session_id: &str,
        message: &str,
        tx: &'a mpsc::UnboundedSender<Progress>,
    ) -> Result<SendOutcome>;
}

pub type SessionStoreBox = Arc<dyn SessionStore + Send + Sync>;
pub type AgentExecutorBox = Arc<dyn AgentExecutor + Send + Sync>;
