//! Persistence-backed state holders.
//!
//! Each repository owns one slice of the durable state, keeps it in memory,
//! and writes it back to the [`KeyValueStore`](crate::ports::key_value_store::KeyValueStore)
//! after every mutation.

pub mod conversation;
pub mod provider;

/// Storage keys of the three persisted entries.
pub mod keys {
    /// JSON array of conversations.
    pub const CONVERSATIONS: &str = "conversations";
    /// Raw id of the active conversation; absent when none is active.
    pub const CURRENT_CONVERSATION_ID: &str = "current-conversation-id";
    /// JSON object `{apiKey, model}`.
    pub const PROVIDER_CONFIG: &str = "provider-config";
}
