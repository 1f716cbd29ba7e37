#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;

use super::create_id;
use super::Role;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    kind: MessageKind,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message::new_with_kind(role, MessageKind::Normal, content);
    }

    pub fn new_with_kind(role: Role, kind: MessageKind, content: &str) -> Message {
        return Message {
            id: create_id(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            kind,
        };
    }

    /// Rebuilds a message already held by the session store.
    pub fn from_store(id: &str, role: Role, content: &str, timestamp: DateTime<Utc>) -> Message {
        return Message {
            id: id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
            kind: MessageKind::Normal,
        };
    }

    pub fn message_kind(&self) -> MessageKind {
        return self.kind;
    }

    pub fn is_error(&self) -> bool {
        return self.kind == MessageKind::Error;
    }

    /// Whether two messages describe the same stored entry, ignoring ids.
    pub fn same_entry(&self, other: &Message) -> bool {
        return self.role == other.role
            && self.content == other.content
            && self.timestamp.timestamp_millis() == other.timestamp.timestamp_millis();
    }
}
