//! Infrastructure layer for cogerphere
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the file-backed store, the OpenRouter
//! streaming client, the JSONL transcript logger, and configuration
//! file loading.

pub mod config;
pub mod logging;
pub mod openrouter;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigSources, ConfigValidationError, FileConfig};
pub use logging::JsonlConversationLogger;
pub use openrouter::{ChunkError, OpenRouterGateway, OpenRouterSettings};
pub use storage::FileKeyValueStore;
