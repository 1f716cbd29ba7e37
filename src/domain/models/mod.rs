mod api;
mod error;
mod event;
mod message;
mod presentation;
mod role;
mod session;
mod session_state;
mod slash_commands;
mod stream_event;
mod task;
mod timestamp;

pub use api::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use presentation::*;
pub use role::*;
pub use session::*;
pub use session_state::*;
pub use slash_commands::*;
pub use stream_event::*;
pub use task::*;
pub use timestamp::*;
