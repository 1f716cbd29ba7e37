use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Failed to load sessions: {0}")]
    Load(String),

    #[error("Failed to create session: {0}")]
    Create(String),

    #[error("Failed to delete session: {0}")]
    Delete(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No session found for id {0}")]
    UnknownSession(String),

    #[error("Session {0} is still waiting on a response")]
    Busy(String),

    #[error("Message is empty")]
    EmptyMessage,
}
