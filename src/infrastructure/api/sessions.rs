#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;

use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ensure_success;
use super::AgentD;
use crate::domain::models::create_id;
use crate::domain::models::format_timestamp;
use crate::domain::models::parse_timestamp_lenient;
use crate::domain::models::Message;
use crate::domain::models::MessageRecord;
use crate::domain::models::NewSession;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::SessionKind;
use crate::domain::models::SessionStore;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

impl SessionResponse {
    fn into_session(self) -> Session {
        return Session::new(
            &self.id,
            &self.title,
            parse_timestamp_lenient(&self.created_at),
            parse_timestamp_lenient(&self.updated_at),
        );
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionListResponse {
    #[serde(default)]
    sessions: Vec<SessionResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    id: serde_json::Value,
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: String,
}

impl MessageResponse {
    fn into_message(self) -> Message {
        let id = match self.id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Null => create_id(),
            other => other.to_string(),
        };

        let role = Role::from_str(&self.role).unwrap_or_else(|_| {
            tracing::warn!(role = %self.role, message_id = %id, "Unknown message role");
            return Role::Assistant;
        });

        return Message::from_store(
            &id,
            role,
            &self.content,
            parse_timestamp_lenient(&self.timestamp),
        );
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CreateSessionRequest {
    id: String,
    title: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AppendMessageRequest {
    session_id: String,
    role: String,
    content: String,
    timestamp: String,
}

#[async_trait]
impl SessionStore for AgentD {
    #[allow(clippy::implicit_return)]
    async fn list_sessions(&self, kind: SessionKind) -> Result<Vec<Session>> {
        let res = self
            .get_json::<SessionListResponse>(
                &format!("/api/chat_sessions?type={kind}"),
                "Listing sessions",
            )
            .await?;

        return Ok(res
            .sessions
            .into_iter()
            .map(|e| return e.into_session())
            .collect());
    }

    #[allow(clippy::implicit_return)]
    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let res = self
            .get_json::<MessageListResponse>(
                &format!("/api/chat_sessions/{session_id}"),
                "Loading messages",
            )
            .await?;

        return Ok(res
            .messages
            .into_iter()
            .map(|e| return e.into_message())
            .collect());
    }

    #[allow(clippy::implicit_return)]
    async fn create_session(&self, session: &NewSession) -> Result<Session> {
        let req = CreateSessionRequest {
            id: session.id.to_string(),
            title: session.title.to_string(),
        };

        let builder = reqwest::Client::new()
            .post(self.endpoint("/api/chat_sessions"))
            .timeout(self.timeout()?);

        let builder = match serde_json::to_vec(&req) {
            Ok(body) => builder.header(CONTENT_TYPE, "application/json").body(body),
            Err(err) => {
                tracing::warn!(error = ?err, "Falling back to a form body for session creation");
                builder.form(&req)
            }
        };

        let res = ensure_success(builder.send().await?, "Creating session").await?;
        let created = res.json::<SessionResponse>().await?.into_session();
        tracing::debug!(session_id = %created.id, title = %created.title, "Session created");

        return Ok(created);
    }

    #[allow(clippy::implicit_return)]
    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let res = reqwest::Client::new()
            .delete(self.endpoint(&format!("/api/chat_sessions/{session_id}")))
            .timeout(self.timeout()?)
            .send()
            .await?;

        ensure_success(res, "Deleting session").await?;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn append_message(&self, record: &MessageRecord) -> Result<()> {
        let req = AppendMessageRequest {
            session_id: record.session_id.to_string(),
            role: record.role.to_string(),
            content: record.content.to_string(),
            timestamp: format_timestamp(&record.timestamp),
        };

        let res = reqwest::Client::new()
            .post(self.endpoint("/api/chat_message"))
            .timeout(self.timeout()?)
            .json(&req)
            .send()
            .await?;

        ensure_success(res, "Saving message").await?;

        return Ok(());
    }
}
