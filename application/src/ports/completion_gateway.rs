//! Completion gateway port
//!
//! Defines the interface for streaming chat completions from the external
//! endpoint.

use async_trait::async_trait;
use cogerphere_domain::{ChatTurn, ProviderConfig, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Fallback text when the endpoint rejects a request without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get response from API";

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Non-2xx response. `message` is the server's `error.message` when it
    /// sent one, otherwise [`GENERIC_FAILURE_MESSAGE`].
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The body broke off or carried an error object mid-stream.
    #[error("{0}")]
    StreamError(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl GatewayError {
    /// HTTP status, if the endpoint answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Everything needed to issue one completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub config: ProviderConfig,
    /// Full history, oldest first, ending with the new user message.
    pub turns: Vec<ChatTurn>,
}

impl CompletionRequest {
    pub fn new(config: ProviderConfig, turns: Vec<ChatTurn>) -> Self {
        Self { config, turns }
    }
}

/// Handle for receiving streaming events from one completion.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`; dropping it tells the producer to
/// stop reading the response body.
pub struct StreamHandle {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the producer has gone away.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

/// Gateway to the chat-completion endpoint
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Issue a streaming completion request.
    ///
    /// Resolves once the response headers arrive. A non-2xx status resolves
    /// to [`GatewayError::RequestFailed`]; on success the returned handle
    /// yields deltas followed by one terminal event. Firing `cancel` must
    /// abort the request and stop the body reader promptly.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, GatewayError>;
}
