//! Streaming events for completion requests.
//!
//! [`StreamEvent`] represents individual events in a streaming completion,
//! enabling real-time display of model output as it's generated.

/// An event in a streaming completion response.
///
/// Bridges the transport-level SSE body to the application layer. A stream
/// carries any number of `Delta` events followed by exactly one terminal
/// event (`Completed` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text fragment from the model (`choices[0].delta.content`).
    Delta(String),
    /// The complete response text (signals stream end).
    Completed(String),
    /// An error that occurred mid-stream.
    Error(String),
}
