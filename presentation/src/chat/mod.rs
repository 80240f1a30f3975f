//! Interactive chat module
//!
//! Provides a readline-based interactive chat interface over the session
//! manager.

mod command;
mod repl;
mod send;

pub use command::ReplCommand;
pub use repl::ChatRepl;
pub use send::{print_outcome, send_interruptible};
