//! Run events
//!
//! An agent run produces [`StepEvent`]s on a single ordered channel. Blocking
//! callers drain it; streaming callers pass it through the
//! [`EventStreamAdapter`], which turns it into the wire protocol sent to
//! SSE clients.

mod step;
mod stream;

#[cfg(test)]
mod tests;

pub use step::{EventEmitter, StepEvent};
pub use stream::{truncate_chars, EventStreamAdapter, StreamEvent, PREVIEW_CHARS};
