//! Lifecycle of a single send operation.

use crate::conversation::value_objects::{ConversationId, MessageId};

/// Phase of a send (state machine).
///
/// ```text
/// Idle → Validating → AwaitingFirstByte → Streaming → Completed
///            ↘ Idle (rejected)
///                                                   ↘ Failed
///                                                   ↘ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendPhase {
    Idle,
    Validating,
    /// Request issued, no response bytes yet.
    AwaitingFirstByte,
    /// At least one delta has arrived.
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SendPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SendPhase::Completed | SendPhase::Failed | SendPhase::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SendPhase::Idle => "idle",
            SendPhase::Validating => "validating",
            SendPhase::AwaitingFirstByte => "awaiting_first_byte",
            SendPhase::Streaming => "streaming",
            SendPhase::Completed => "completed",
            SendPhase::Failed => "failed",
            SendPhase::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SendPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a send ended when it did not fail.
///
/// Cancellation is a distinct successful exit rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The endpoint finished; `content` is the final assistant text.
    Completed {
        conversation_id: ConversationId,
        message_id: MessageId,
        content: String,
    },
    /// The user stopped the stream; the placeholder was retracted.
    Cancelled { conversation_id: ConversationId },
}

impl SendOutcome {
    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            SendOutcome::Completed {
                conversation_id, ..
            }
            | SendOutcome::Cancelled { conversation_id } => conversation_id,
        }
    }

    pub fn phase(&self) -> SendPhase {
        match self {
            SendOutcome::Completed { .. } => SendPhase::Completed,
            SendOutcome::Cancelled { .. } => SendPhase::Cancelled,
        }
    }
}
