#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use super::stream::run_exchange;
use super::SessionManager;
use crate::domain::models::AgentExecutorBox;
use crate::domain::models::ControllerError;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageKind;
use crate::domain::models::MessageRecord;
use crate::domain::models::PresentationState;
use crate::domain::models::Progress;
use crate::domain::models::Role;
use crate::domain::models::SendOutcome;

/// Drives one user message through the agent and folds the result back into
/// the session it was sent on.
#[derive(Clone)]
pub struct ChatService {
    sessions: SessionManager,
    executor: AgentExecutorBox,
}

impl ChatService {
    pub fn new(sessions: SessionManager, executor: AgentExecutorBox) -> ChatService {
        return ChatService { sessions, executor };
    }

    pub fn sessions(&self) -> &SessionManager {
        return &self.sessions;
    }

    /// Sends to the active session, creating one titled after the message
    /// when none is selected.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, ControllerError> {
        if text.trim().is_empty() {
            return Err(ControllerError::EmptyMessage);
        }

        let session_id = match self.sessions.active_session_id().await {
            Some(id) => id,
            None => self.sessions.create_session(Some(text)).await?.id,
        };

        return self.send_message_to(&session_id, text).await;
    }

    /// Sends to a specific session. Agent and transport failures come back as
    /// `SendOutcome::Failed` and are recorded as an error message; only
    /// precondition failures are returned as errors.
    pub async fn send_message_to(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SendOutcome, ControllerError> {
        if text.trim().is_empty() {
            return Err(ControllerError::EmptyMessage);
        }

        let user_message = Message::new(Role::User, text);
        let needs_title = {
            let mut state = self.sessions.state.lock().await;
            let needs_title = match state.get(session_id) {
                Some(session) => session.has_placeholder_title(),
                None => return Err(ControllerError::UnknownSession(session_id.to_string())),
            };
            if !state.try_mark_busy(session_id) {
                return Err(ControllerError::Busy(session_id.to_string()));
            }
            state.append_message(session_id, user_message.clone());
            state.set_presentation(session_id, PresentationState::Awaiting);
            needs_title
        };

        tracing::debug!(session_id, "Sending message");
        self.sessions.notify(Event::MessageAppended(
            session_id.to_string(),
            user_message.clone(),
        ));
        self.sessions.notify(Event::Presentation(
            session_id.to_string(),
            PresentationState::Awaiting,
        ));

        self.persist(session_id, &user_message).await;
        if needs_title {
            self.sessions.reconcile_titles().await;
        }

        let outcome = self.exchange(session_id, text).await;
        self.commit(session_id, &outcome).await;

        return Ok(outcome);
    }

    async fn exchange(&self, session_id: &str, text: &str) -> SendOutcome {
        let res = run_exchange(&self.executor, session_id, text, move |progress| {
            return self.apply_progress(session_id, progress);
        })
        .await;

        match res {
            Ok(outcome) => return outcome,
            Err(err) => {
                tracing::error!(error = ?err, session_id, "Chat request failed");
                return SendOutcome::Failed {
                    error_text: format!("Could not get response from AI. {err}"),
                };
            }
        }
    }

    async fn apply_progress(&self, session_id: &str, progress: Progress) {
        let state = PresentationState::AwaitingWithProgress(progress);
        self.sessions
            .state
            .lock()
            .await
            .set_presentation(session_id, state.clone());
        self.sessions
            .notify(Event::Presentation(session_id.to_string(), state));
    }

    async fn commit(&self, session_id: &str, outcome: &SendOutcome) {
        let message = match outcome {
            SendOutcome::Reply { assistant_text } => Message::new(Role::Assistant, assistant_text),
            SendOutcome::Failed { error_text } => {
                Message::new_with_kind(Role::Assistant, MessageKind::Error, error_text)
            }
        };

        let appended = {
            let mut state = self.sessions.state.lock().await;
            let appended = state.append_message(session_id, message.clone());
            state.clear_busy(session_id);
            state.set_presentation(session_id, PresentationState::Idle);
            appended
        };

        self.sessions.notify(Event::Presentation(
            session_id.to_string(),
            PresentationState::Idle,
        ));

        if !appended {
            tracing::debug!(session_id, "Discarding reply for a session no longer tracked");
            return;
        }

        self.sessions
            .notify(Event::MessageAppended(session_id.to_string(), message.clone()));
        self.persist(session_id, &message).await;
    }

    /// Mirrors a message to the store. Failures are reported, not retried.
    async fn persist(&self, session_id: &str, message: &Message) {
        let record = MessageRecord::new(session_id, message);
        if let Err(err) = self.sessions.store.append_message(&record).await {
            tracing::warn!(error = ?err, session_id, "Failed to persist message");
            self.sessions
                .notify(Event::PersistFailed(session_id.to_string(), err.to_string()));
        }
    }
}
