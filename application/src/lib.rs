//! Application layer for cogerphere
//!
//! This crate contains the session manager, the conversation repository and
//! the port definitions that infrastructure adapters implement.
//! It depends only on the domain layer.

pub mod ports;
pub mod repository;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    completion_gateway::{CompletionGateway, CompletionRequest, GatewayError, StreamHandle},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    key_value_store::{InMemoryStore, KeyValueStore, StoreError},
    notice::{NoNotices, Notice, NoticeLevel, NoticeSink},
    progress::{NoStreamProgress, StreamProgressNotifier},
};
pub use repository::{
    conversation::ConversationRepository, keys as storage_keys, provider::ProviderSettings,
};
pub use use_cases::session_manager::{SessionError, SessionManager};
