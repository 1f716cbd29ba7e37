mod chat;
#[cfg(test)]
pub mod fakes;
mod reveal;
mod session_manager;
pub mod stream;
mod tasks;

pub use chat::*;
pub use reveal::*;
pub use session_manager::*;
pub use tasks::*;
