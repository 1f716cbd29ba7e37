#[cfg(test)]
#[path = "stream_event_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub step: u32,
    pub total: u32,
    #[serde(default)]
    pub message: String,
}

impl Progress {
    /// `round(100 * step / total)`, clamped to `0..=100`.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }

        let pct = (100.0 * f64::from(self.step) / f64::from(self.total)).round();
        return pct.clamp(0.0, 100.0) as u8;
    }
}

/// One `data: {json}` record of the `/api/chat` stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Progress(Progress),
    Response { content: String },
    Error { message: String },
}

/// How an exchange with the agent ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Reply { assistant_text: String },
    Failed { error_text: String },
}

impl SendOutcome {
    pub fn text(&self) -> &str {
        match self {
            SendOutcome::Reply { assistant_text } => return assistant_text,
            SendOutcome::Failed { error_text } => return error_text,
        }
    }

    pub fn is_failure(&self) -> bool {
        return matches!(self, SendOutcome::Failed { .. });
    }
}
