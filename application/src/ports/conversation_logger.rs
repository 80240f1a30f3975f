//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording send lifecycle
//! events (message sent, stream completed, failed, cancelled) to a
//! transcript.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the
//! conversation transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// Event type names written by the session manager.
pub mod events {
    pub const MESSAGE_SENT: &str = "message_sent";
    pub const STREAM_COMPLETED: &str = "stream_completed";
    pub const STREAM_FAILED: &str = "stream_failed";
    pub const STREAM_CANCELLED: &str = "stream_cancelled";
}

/// A structured conversation event for logging.
pub struct ConversationEvent {
    /// Event type identifier, one of [`events`].
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and infallible; implementations swallow their own
/// write errors.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when the transcript is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
