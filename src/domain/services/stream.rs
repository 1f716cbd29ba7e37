#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;

use std::future::Future;

use anyhow::Result;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use crate::domain::models::AgentExecutorBox;
use crate::domain::models::Progress;
use crate::domain::models::SendOutcome;
use crate::domain::models::StreamEvent;

const RECORD_SEPARATOR: &str = "\n\n";
const DATA_PREFIX: &str = "data: ";
const READ_CHUNK_SIZE: usize = 8 * 1024;

pub const STREAM_ENDED_TEXT: &str = "The agent stream ended without a response.";

/// Incrementally turns raw body bytes into stream events.
///
/// Bytes are decoded as UTF-8 across chunk boundaries, then buffered until a
/// blank-line separator closes a record. Whatever trails the last separator
/// stays buffered for the next chunk.
#[derive(Default)]
pub struct EventStreamDecoder {
    pending: Vec<u8>,
    buffer: String,
}

impl EventStreamDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode(chunk);

        let mut events = vec![];
        while let Some(idx) = self.buffer.find(RECORD_SEPARATOR) {
            let rest = self.buffer.split_off(idx + RECORD_SEPARATOR.len());
            let mut record = std::mem::replace(&mut self.buffer, rest);
            record.truncate(idx);

            if let Some(event) = parse_record(&record) {
                events.push(event);
            }
        }

        return events;
    }

    /// Flushes the decoder, returning any unterminated trailing fragment.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.buffer
                .push_str(&String::from_utf8_lossy(&std::mem::take(&mut self.pending)));
        }

        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            return None;
        }

        return Some(rest);
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));

                    match err.error_len() {
                        // Incomplete sequence at the end, wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}

/// Classifies one record. Only `data: ` records carry events; anything else,
/// including JSON that doesn't describe a known event, is skipped.
pub fn parse_record(record: &str) -> Option<StreamEvent> {
    if record.trim().is_empty() {
        return None;
    }

    let payload = match record.strip_prefix(DATA_PREFIX) {
        Some(payload) => payload,
        None => {
            tracing::trace!(record, "Skipping stream record without data prefix");
            return None;
        }
    };

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => return Some(event),
        Err(err) => {
            tracing::warn!(error = ?err, payload, "Skipping unrecognized stream record");
            return None;
        }
    }
}

/// Reads an agent event stream until its terminal event. Progress events are
/// forwarded in arrival order; nothing after the terminal event is read.
pub async fn consume_event_stream<R>(
    mut reader: R,
    tx: &mpsc::UnboundedSender<Progress>,
) -> Result<SendOutcome>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = EventStreamDecoder::default();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }

        for event in decoder.push(&chunk[..read]) {
            match event {
                StreamEvent::Progress(progress) => {
                    tracing::debug!(
                        step = progress.step,
                        total = progress.total,
                        detail = %progress.message,
                        "Stream progress"
                    );
                    tx.send(progress)?;
                }
                StreamEvent::Response { content } => {
                    return Ok(SendOutcome::Reply {
                        assistant_text: content,
                    });
                }
                StreamEvent::Error { message } => {
                    tracing::warn!(error_text = %message, "Agent reported an error");
                    return Ok(SendOutcome::Failed {
                        error_text: message,
                    });
                }
            }
        }
    }

    if let Some(fragment) = decoder.finish() {
        tracing::debug!(fragment = %fragment, "Discarding unterminated stream record");
    }
    tracing::warn!("Agent stream ended without a terminal event");

    return Ok(SendOutcome::Failed {
        error_text: STREAM_ENDED_TEXT.to_string(),
    });
}

/// Runs one exchange through an executor, handing each progress event to
/// `on_progress` before the outcome is returned.
pub async fn run_exchange<F, Fut>(
    executor: &AgentExecutorBox,
    session_id: &str,
    message: &str,
    mut on_progress: F,
) -> Result<SendOutcome>
where
    F: FnMut(Progress) -> Fut,
    Fut: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
    let exchange = executor.send(session_id, message, &tx);
    tokio::pin!(exchange);

    let res = loop {
        tokio::select! {
            biased;
            Some(progress) = rx.recv() => {
                on_progress(progress).await;
            }
            res = &mut exchange => {
                break res;
            }
        }
    };

    while let Ok(progress) = rx.try_recv() {
        on_progress(progress).await;
    }

    return res;
}
