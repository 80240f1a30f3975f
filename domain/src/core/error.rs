//! Domain error types

use thiserror::Error;

/// Precondition failures detected before a message is sent.
///
/// These never mutate state: the caller reports them and stays in `Idle`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Please set your API key in settings")]
    MissingApiKey,
}

impl ValidationError {
    /// Short heading used when the error is shown as a notice.
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::EmptyMessage => "Message Required",
            ValidationError::MissingApiKey => "API Key Required",
        }
    }
}
