//! Provider configuration domain.
//!
//! - [`config::ProviderConfig`] — API key and model used for every request

pub mod config;
