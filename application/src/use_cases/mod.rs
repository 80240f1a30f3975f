//! Use cases
//!
//! - [`session_manager`] — conversations, provider settings and streaming
//!   sends behind one entry point

pub mod session_manager;
