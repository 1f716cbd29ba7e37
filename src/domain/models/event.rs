use super::AgentTask;
use super::Message;
use super::PresentationState;

/// Notifications emitted by the controller to whoever renders it.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ActiveSessionChanged(Option<String>),
    MessageAppended(String, Message),
    PersistFailed(String, String),
    Presentation(String, PresentationState),
    RevealDone(),
    RevealLine(String),
    SessionsChanged(),
    TaskUpdated(AgentTask),
}
