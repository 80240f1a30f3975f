//! OpenRouter streaming client
//!
//! Issues `POST /chat/completions` with `stream: true` and turns the
//! server-sent-event body into [`StreamEvent`](cogerphere_domain::StreamEvent)s.

pub mod gateway;
pub mod sse;
pub mod types;

pub use gateway::{DEFAULT_ENDPOINT, OpenRouterGateway, OpenRouterSettings};
pub use sse::{ChunkError, SseFrame, SseLineBuffer, parse_sse_line};
