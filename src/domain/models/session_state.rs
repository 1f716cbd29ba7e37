#[cfg(test)]
#[path = "session_state_test.rs"]
mod tests;

use std::collections::HashMap;
use std::collections::HashSet;

use super::Message;
use super::PresentationState;
use super::Session;

/// In-memory session collection and everything derived from it. Mutated only
/// through whole-operation methods so callers re-read it at commit time.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    sessions: Vec<Session>,
    active_session_id: Option<String>,
    creations_in_flight: usize,
    initial_load_done: bool,
    busy: HashSet<String>,
    presentation: HashMap<String, PresentationState>,
}

impl SessionState {
    pub fn sessions(&self) -> &[Session] {
        return &self.sessions;
    }

    pub fn active_session_id(&self) -> Option<&str> {
        return self.active_session_id.as_deref();
    }

    pub fn active_session(&self) -> Option<&Session> {
        let id = self.active_session_id.as_deref()?;
        return self.get(id);
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        return self.sessions.iter().find(|e| return e.id == id);
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        return self.sessions.iter_mut().find(|e| return e.id == id);
    }

    pub fn contains(&self, id: &str) -> bool {
        return self.get(id).is_some();
    }

    pub fn initial_load_done(&self) -> bool {
        return self.initial_load_done;
    }

    /// Swaps in a freshly listed collection. Messages already loaded for a
    /// session carry over. The active pointer survives if its session still
    /// exists, otherwise it falls back to the first session.
    pub fn replace_sessions(&mut self, incoming: Vec<Session>) {
        let mut previous = std::mem::take(&mut self.sessions);
        self.sessions = incoming
            .into_iter()
            .map(|mut session| {
                if let Some(idx) = previous.iter().position(|e| return e.id == session.id) {
                    let known = previous.swap_remove(idx);
                    session.messages = known.messages;
                    session.messages_loaded = known.messages_loaded;
                }
                return session;
            })
            .collect();

        self.initial_load_done = true;
        self.repair_active();
        self.prune_derived();
    }

    /// Inserts a newly created session at the head and makes it active.
    pub fn insert_head(&mut self, session: Session) {
        self.sessions.retain(|e| return e.id != session.id);
        self.active_session_id = Some(session.id.to_string());
        self.sessions.insert(0, session);
    }

    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }

        self.active_session_id = Some(id.to_string());
        return true;
    }

    /// Removes a session and repairs the active pointer when it pointed at it.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let idx = self.sessions.iter().position(|e| return e.id == id)?;
        let removed = self.sessions.remove(idx);

        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = self.sessions.first().map(|e| return e.id.to_string());
        }
        self.busy.remove(id);
        self.presentation.remove(id);

        return Some(removed);
    }

    pub fn merge_messages(&mut self, id: &str, history: Vec<Message>) -> bool {
        if let Some(session) = self.get_mut(id) {
            session.merge_history(history);
            return true;
        }

        return false;
    }

    pub fn append_message(&mut self, id: &str, message: Message) -> bool {
        if let Some(session) = self.get_mut(id) {
            session.push_message(message);
            return true;
        }

        return false;
    }

    pub fn begin_creation(&mut self) {
        self.creations_in_flight += 1;
    }

    pub fn end_creation(&mut self) {
        self.creations_in_flight = self.creations_in_flight.saturating_sub(1);
    }

    pub fn is_creating(&self) -> bool {
        return self.creations_in_flight > 0;
    }

    /// Claims the single automatic creation allowed once the initial listing
    /// came back empty. The claim counts as an in-flight creation and must be
    /// released with `end_creation`.
    pub fn claim_auto_create(&mut self) -> bool {
        if !self.initial_load_done() || !self.sessions.is_empty() || self.is_creating() {
            return false;
        }

        self.begin_creation();
        return true;
    }

    /// Marks a session as having a send in flight. Returns false when one is
    /// already outstanding.
    pub fn try_mark_busy(&mut self, id: &str) -> bool {
        if self.is_busy(id) {
            return false;
        }

        self.busy.insert(id.to_string());
        return true;
    }

    pub fn clear_busy(&mut self, id: &str) {
        self.busy.remove(id);
    }

    pub fn is_busy(&self, id: &str) -> bool {
        return self.busy.contains(id);
    }

    pub fn presentation(&self, id: &str) -> PresentationState {
        return self.presentation.get(id).cloned().unwrap_or_default();
    }

    pub fn set_presentation(&mut self, id: &str, state: PresentationState) {
        if state == PresentationState::Idle || !self.contains(id) {
            self.presentation.remove(id);
            return;
        }

        self.presentation.insert(id.to_string(), state);
    }

    fn repair_active(&mut self) {
        let still_present = self
            .active_session_id
            .as_deref()
            .map(|id| return self.contains(id))
            .unwrap_or(false);

        if !still_present {
            self.active_session_id = self.sessions.first().map(|e| return e.id.to_string());
        }
    }

    fn prune_derived(&mut self) {
        let ids = self
            .sessions
            .iter()
            .map(|e| return e.id.to_string())
            .collect::<HashSet<String>>();
        self.presentation.retain(|id, _| return ids.contains(id));
    }
}
