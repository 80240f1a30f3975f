//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ValidationError`] — rejected user input
//! - [`string`] — UTF-8 safe truncation helpers

pub mod error;
pub mod string;
