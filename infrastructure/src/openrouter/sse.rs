//! Server-sent-event parsing for the streaming body.
//!
//! The body arrives in arbitrary network-sized pieces. [`SseLineBuffer`]
//! reassembles complete lines at the byte level, so a UTF-8 sequence split
//! across two reads is decoded intact, and [`parse_sse_line`] turns one line
//! into an [`SseFrame`].

use super::types::{ErrorEnvelope, StreamChunk};
use cogerphere_application::ports::completion_gateway::GENERIC_FAILURE_MESSAGE;
use thiserror::Error;

/// A `data:` payload that is not a valid chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Malformed stream chunk: {0}")]
    Malformed(String),
}

/// Meaning of one SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A non-empty text fragment.
    Delta(String),
    /// `data: [DONE]`
    Done,
    /// An error object delivered inside the stream.
    Error(String),
    /// Comments, keep-alives, `event:`/`id:` fields, role-only chunks.
    Ignored,
}

/// Buffers partial lines across reads.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them, without the
    /// trailing `\n` or `\r\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Upper bound on unframed text kept for error reporting.
const MAX_UNFRAMED_BYTES: usize = 64 * 1024;

/// Text of a body that never produced a `data:` line.
///
/// Some upstream failures arrive with a 2xx status as a bare JSON error
/// object, so nothing in the body is framed as SSE.
#[derive(Debug, Default)]
pub struct UnframedBody {
    saw_data: bool,
    text: String,
}

impl UnframedBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one complete line. Comments are skipped; everything is
    /// discarded once a `data:` line has been seen.
    pub fn observe(&mut self, line: &str) {
        if self.saw_data {
            return;
        }
        if line.starts_with("data:") {
            self.saw_data = true;
            self.text.clear();
            return;
        }
        if line.starts_with(':') || self.text.len() >= MAX_UNFRAMED_BYTES {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }

    /// Failure message for a body that ended without any `data:` line:
    /// the server's `error.message` when present, otherwise the generic one.
    pub fn failure(&self) -> Option<String> {
        if self.saw_data {
            return None;
        }
        Some(
            ErrorEnvelope::message_from(&self.text)
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
        )
    }
}

/// Interpret one complete SSE line.
pub fn parse_sse_line(line: &str) -> Result<SseFrame, ChunkError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseFrame::Ignored);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseFrame::Ignored);
    }
    if data == "[DONE]" {
        return Ok(SseFrame::Done);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| ChunkError::Malformed(e.to_string()))?;

    if let Some(error) = chunk.error {
        let message = error
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        return Ok(SseFrame::Error(message));
    }

    match chunk.content() {
        Some(text) if !text.is_empty() => Ok(SseFrame::Delta(text.to_string())),
        _ => Ok(SseFrame::Ignored),
    }
}
