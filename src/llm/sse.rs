//! Incremental decoder for server-sent-event completion streams.
//!
//! Network chunks do not align with event frames, so the decoder buffers
//! partial lines across `feed` calls and only emits frames for complete
//! lines. Malformed frames are skipped (logged, never fatal); the `[DONE]`
//! sentinel is surfaced as an explicit end-of-stream frame.

use serde::Deserialize;
use tracing::debug;

/// A decoded frame from the completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// An incremental content fragment.
    Delta(String),
    /// The provider's end-of-stream sentinel.
    Done,
}

/// Buffering line decoder for SSE byte streams.
///
/// Finite and not restartable: once `Done` has been emitted the caller
/// should stop feeding.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns the frames completed by this chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim().to_string();
            self.buffer.drain(..=newline);

            if let Some(frame) = decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Decodes one complete SSE line into a frame.
///
/// Blank lines, comments, and non-data fields are protocol noise; malformed
/// data payloads are skipped so one corrupt frame cannot abort the
/// completion.
fn decode_line(line: &str) -> Option<SseFrame> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => event
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseFrame::Delta),
        Err(e) => {
            debug!("Skipping malformed SSE frame: {e}");
            None
        }
    }
}

// Wire format of a streamed completion delta.

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
