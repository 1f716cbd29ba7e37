#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

use super::convert_err;
use super::ensure_success;
use super::AgentD;
use crate::domain::models::AgentExecutor;
use crate::domain::models::Progress;
use crate::domain::models::SendOutcome;
use crate::domain::services::stream::consume_event_stream;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatRequest {
    session_id: String,
    message: String,
}

#[async_trait]
impl AgentExecutor for AgentD {
    #[allow(clippy::implicit_return)]
    async fn send<'a>(
        &self,
        session_id: &str,
        message: &str,
        tx: &'a mpsc::UnboundedSender<Progress>,
    ) -> Result<SendOutcome> {
        let req = ChatRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
        };

        // Agent runs take as long as they take, so no timeout here.
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/chat"))
            .json(&req)
            .send()
            .await?;

        let res = ensure_success(res, "Chat request").await?;
        let stream = res.bytes_stream().map_err(convert_err);

        return consume_event_stream(StreamReader::new(stream), tx).await;
    }
}
