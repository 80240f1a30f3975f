//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod completion_gateway;
pub mod conversation_logger;
pub mod key_value_store;
pub mod notice;
pub mod progress;
