//! Presentation layer for cogerphere
//!
//! This crate contains CLI definitions, output formatters,
//! progress reporters, and the interactive chat interface.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::{ChatRepl, print_outcome, send_interruptible};
pub use cli::commands::Cli;
pub use output::console::{ConsoleFormatter, ConsoleNotices};
pub use progress::reporter::StreamReporter;
