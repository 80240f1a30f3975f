//! Domain layer for cogerphere
//!
//! This crate contains the core entities and value objects of the chat client.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! A [`Conversation`] is one ordered thread of [`Message`]s with its own
//! identity and title. The [`ConversationCollection`] holds every conversation
//! plus the pointer to the active one.
//!
//! ## Provider configuration
//!
//! [`ProviderConfig`] is the credential and model-identifier pair used to
//! authenticate and parameterize requests to the completion endpoint.
//!
//! ## Streaming
//!
//! A send moves through [`SendPhase`]s while the endpoint delivers
//! [`StreamEvent`]s (deltas of assistant output).

pub mod conversation;
pub mod core;
pub mod provider;
pub mod session;

// Re-export commonly used types
pub use conversation::{
    collection::ConversationCollection,
    entities::{Conversation, Message, NEW_CHAT_TITLE, Role, TITLE_MAX_CHARS},
    value_objects::{ChatTurn, ConversationId, MessageId},
};
pub use core::error::ValidationError;
pub use provider::config::{DEFAULT_MODEL, ProviderConfig};
pub use session::{
    phase::{SendOutcome, SendPhase},
    stream::StreamEvent,
};
