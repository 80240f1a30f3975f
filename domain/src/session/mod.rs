//! Send/stream domain.
//!
//! - [`phase::SendPhase`] — lifecycle of one send
//! - [`phase::SendOutcome`] — non-error terminal results of a send
//! - [`stream::StreamEvent`] — events delivered by the streaming endpoint

pub mod phase;
pub mod stream;
