#[cfg(test)]
#[path = "session_manager_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::domain::models::create_id;
use crate::domain::models::ControllerError;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::NewSession;
use crate::domain::models::Session;
use crate::domain::models::SessionKind;
use crate::domain::models::SessionState;
use crate::domain::models::SessionStoreBox;
use crate::domain::models::DEFAULT_SESSION_TITLE;

/// Owns the session collection and the active-session pointer, and keeps them
/// in step with the session store.
///
/// State sits behind an async mutex that is never held across a store call;
/// every commit re-reads whatever is current at that point.
#[derive(Clone)]
pub struct SessionManager {
    pub(super) store: SessionStoreBox,
    pub(super) state: Arc<Mutex<SessionState>>,
    pub(super) tx: mpsc::UnboundedSender<Event>,
    kind: SessionKind,
}

impl SessionManager {
    pub fn new(
        store: SessionStoreBox,
        kind: SessionKind,
        tx: mpsc::UnboundedSender<Event>,
    ) -> SessionManager {
        return SessionManager {
            store,
            state: Arc::new(Mutex::new(SessionState::default())),
            tx,
            kind,
        };
    }

    pub(super) fn notify(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscriber for controller events");
        }
    }

    /// Keeps sessions of this manager's kind. Older backends ignore the
    /// `type` filter and list everything.
    fn of_kind(&self, sessions: Vec<Session>) -> Vec<Session> {
        let agent = self.kind == SessionKind::Agent;
        return sessions
            .into_iter()
            .filter(|e| return e.is_agent_task() == agent)
            .collect();
    }

    pub async fn snapshot(&self) -> SessionState {
        return self.state.lock().await.clone();
    }

    pub async fn sessions(&self) -> Vec<Session> {
        return self.state.lock().await.sessions().to_vec();
    }

    pub async fn active_session_id(&self) -> Option<String> {
        return self
            .state
            .lock()
            .await
            .active_session_id()
            .map(|e| return e.to_string());
    }

    pub async fn active_session(&self) -> Option<Session> {
        return self.state.lock().await.active_session().cloned();
    }

    /// Initial load: lists sessions, then creates one if the store had none.
    pub async fn initialize(&self) -> Result<Vec<Session>, ControllerError> {
        self.list_sessions().await?;
        self.auto_create().await?;

        return Ok(self.sessions().await);
    }

    /// Initial load for a fresh conversation: lists sessions, then creates
    /// exactly one new session regardless of what the store held.
    pub async fn initialize_new(&self) -> Result<Session, ControllerError> {
        self.list_sessions().await?;
        return self.create_session(None).await;
    }

    /// Replaces the local collection with the store's listing.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, ControllerError> {
        let sessions = self.store.list_sessions(self.kind).await.map_err(|err| {
            tracing::error!(error = ?err, kind = %self.kind, "Failed to list sessions");
            return ControllerError::Load(err.to_string());
        })?;

        let (listed, active) = {
            let mut state = self.state.lock().await;
            state.replace_sessions(self.of_kind(sessions));
            (
                state.sessions().to_vec(),
                state.active_session_id().map(|e| return e.to_string()),
            )
        };

        tracing::debug!(count = listed.len(), "Sessions listed");
        self.notify(Event::SessionsChanged());
        self.notify(Event::ActiveSessionChanged(active));

        return Ok(listed);
    }

    /// Creates a session when the initial listing came back empty and no
    /// creation is already in flight.
    pub async fn auto_create(&self) -> Result<Option<Session>, ControllerError> {
        if !self.state.lock().await.claim_auto_create() {
            return Ok(None);
        }

        tracing::debug!("No sessions available, creating one");
        let res = self.submit_session(DEFAULT_SESSION_TITLE).await;
        return self.commit_created(res).await.map(Some);
    }

    pub async fn create_session(&self, title_hint: Option<&str>) -> Result<Session, ControllerError> {
        let title = title_hint
            .map(|e| return e.trim())
            .filter(|e| return !e.is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE);

        self.state.lock().await.begin_creation();
        let res = self.submit_session(title).await;
        return self.commit_created(res).await;
    }

    async fn submit_session(&self, title: &str) -> Result<Session, ControllerError> {
        let new_session = NewSession {
            id: create_id(),
            title: title.to_string(),
        };

        return self
            .store
            .create_session(&new_session)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, session_id = %new_session.id, "Failed to create session");
                return ControllerError::Create(err.to_string());
            });
    }

    async fn commit_created(
        &self,
        res: Result<Session, ControllerError>,
    ) -> Result<Session, ControllerError> {
        let mut state = self.state.lock().await;
        state.end_creation();
        let session = res?;
        state.insert_head(session.clone());
        drop(state);

        self.notify(Event::SessionsChanged());
        self.notify(Event::ActiveSessionChanged(Some(session.id.to_string())));

        return Ok(session);
    }

    /// Fetches a session's history and merges it in place. Results for a
    /// session deleted meanwhile are dropped.
    pub async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>, ControllerError> {
        let history = self.store.get_messages(session_id).await.map_err(|err| {
            tracing::error!(error = ?err, session_id, "Failed to load messages");
            return ControllerError::Load(err.to_string());
        })?;

        let merged = self
            .state
            .lock()
            .await
            .merge_messages(session_id, history.clone());
        if merged {
            self.notify(Event::SessionsChanged());
        } else {
            tracing::debug!(session_id, "Dropping history for a session no longer tracked");
        }

        return Ok(history);
    }

    pub async fn select_session(&self, session_id: &str) -> Result<(), ControllerError> {
        let needs_load = {
            let mut state = self.state.lock().await;
            if !state.set_active(session_id) {
                return Err(ControllerError::UnknownSession(session_id.to_string()));
            }
            !state
                .get(session_id)
                .map(|e| return e.messages_loaded)
                .unwrap_or(false)
        };

        self.notify(Event::ActiveSessionChanged(Some(session_id.to_string())));
        if needs_load {
            self.load_messages(session_id).await?;
        }

        return Ok(());
    }

    /// Deletes a session in the store, then locally once the store confirmed.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ControllerError> {
        self.store.delete_session(session_id).await.map_err(|err| {
            tracing::error!(error = ?err, session_id, "Failed to delete session");
            return ControllerError::Delete(err.to_string());
        })?;

        let (removed, active) = {
            let mut state = self.state.lock().await;
            let removed = state.remove(session_id).is_some();
            (removed, state.active_session_id().map(|e| return e.to_string()))
        };

        if removed {
            self.notify(Event::SessionsChanged());
            self.notify(Event::ActiveSessionChanged(active));
        }

        return Ok(());
    }

    /// Re-lists sessions so titles the backend derived from a first message
    /// show up. Best effort: failures are logged and the collection is left
    /// as it was.
    pub async fn reconcile_titles(&self) {
        match self.store.list_sessions(self.kind).await {
            Ok(sessions) => {
                let active = {
                    let mut state = self.state.lock().await;
                    state.replace_sessions(self.of_kind(sessions));
                    state.active_session_id().map(|e| return e.to_string())
                };
                self.notify(Event::SessionsChanged());
                self.notify(Event::ActiveSessionChanged(active));
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to refresh session titles");
            }
        }
    }
}
