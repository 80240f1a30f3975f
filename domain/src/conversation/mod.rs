//! Conversation domain.
//!
//! - [`entities::Conversation`] — one ordered thread of messages
//! - [`entities::Message`] — a single message within a conversation
//! - [`collection::ConversationCollection`] — every conversation plus the active pointer
//! - [`value_objects`] — identifiers and the `{role, content}` wire shape

pub mod collection;
pub mod entities;
pub mod value_objects;
