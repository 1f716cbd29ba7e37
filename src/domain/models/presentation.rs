use super::Progress;

/// What the chat view shows for a session while an exchange is in flight.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PresentationState {
    #[default]
    Idle,
    Awaiting,
    AwaitingWithProgress(Progress),
}

impl PresentationState {
    pub fn is_awaiting(&self) -> bool {
        return *self != PresentationState::Idle;
    }

    pub fn progress(&self) -> Option<&Progress> {
        if let PresentationState::AwaitingWithProgress(progress) = self {
            return Some(progress);
        }

        return None;
    }
}
