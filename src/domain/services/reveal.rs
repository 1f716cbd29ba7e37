#[cfg(test)]
#[path = "reveal_test.rs"]
mod tests;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::models::Event;

/// Cosmetic line-by-line reveal of a finished reply, one line per `delay`.
pub struct RevealSequence {
    worker: JoinHandle<()>,
}

impl RevealSequence {
    pub fn start(text: &str, delay: Duration, tx: mpsc::UnboundedSender<Event>) -> RevealSequence {
        let lines = text
            .split('\n')
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();

        let worker = tokio::spawn(async move {
            for (idx, line) in lines.into_iter().enumerate() {
                if idx > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(Event::RevealLine(line)).is_err() {
                    return;
                }
            }

            if tx.send(Event::RevealDone()).is_err() {
                tracing::trace!("Reveal finished without a subscriber");
            }
        });

        return RevealSequence { worker };
    }

    /// Stops revealing. Lines already emitted stay emitted.
    pub fn cancel(&self) {
        self.worker.abort();
    }
}
