//! Progress notification port
//!
//! Defines the interface for reporting progress of a send while the reply
//! streams in.

use cogerphere_domain::{ConversationId, MessageId, SendPhase};

/// Callback for progress updates during a send
///
/// Implementations live in the presentation layer (spinner, incremental
/// printing). Both callbacks run on the task driving the send, so they must
/// return quickly.
pub trait StreamProgressNotifier: Send + Sync {
    /// Called on every phase transition, terminal phases included.
    fn on_phase(&self, _conversation_id: &ConversationId, _phase: SendPhase) {}

    /// Called after each delta with the full assistant text so far.
    fn on_content(&self, _conversation_id: &ConversationId, _message_id: &MessageId, _content: &str) {
    }
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoStreamProgress;

impl StreamProgressNotifier for NoStreamProgress {}
