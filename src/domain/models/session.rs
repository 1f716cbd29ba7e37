#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use super::Message;

pub const DEFAULT_SESSION_TITLE: &str = "Untitled Chat";
pub const PLACEHOLDER_SESSION_TITLES: [&str; 2] = [DEFAULT_SESSION_TITLE, "New Chat"];
pub const AGENT_TASK_TITLE_PREFIX: &str = "Agent Task: ";

/// Short random opaque id. Collisions are unlikely, not impossible.
pub fn create_id() -> String {
    return Uuid::new_v4()
        .to_string()
        .split('-')
        .enumerate()
        .filter_map(|(idx, str)| {
            if idx > 1 {
                return None;
            }
            return Some(str);
        })
        .collect::<Vec<&str>>()
        .join("-");
}

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumVariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Chat,
    Agent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages_loaded: bool,
}

impl Session {
    pub fn new(
        id: &str,
        title: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Session {
        return Session {
            id: id.to_string(),
            title: title.to_string(),
            messages: vec![],
            created_at,
            updated_at,
            messages_loaded: false,
        };
    }

    pub fn has_placeholder_title(&self) -> bool {
        return PLACEHOLDER_SESSION_TITLES.contains(&self.title.as_str());
    }

    pub fn is_agent_task(&self) -> bool {
        return self.title.starts_with(AGENT_TASK_TITLE_PREFIX);
    }

    pub fn push_message(&mut self, message: Message) {
        if message.timestamp > self.updated_at {
            self.updated_at = message.timestamp;
        }
        self.messages.push(message);
    }

    /// Replaces history with what the store returned. Entries appended locally
    /// before the first load finished are kept after it unless the store
    /// already holds them.
    pub fn merge_history(&mut self, history: Vec<Message>) {
        let pending = if self.messages_loaded {
            vec![]
        } else {
            std::mem::take(&mut self.messages)
        };

        self.messages = history;
        for message in pending {
            if self.messages.iter().any(|e| return e.same_entry(&message)) {
                continue;
            }
            self.messages.push(message);
        }

        self.messages_loaded = true;
    }
}
