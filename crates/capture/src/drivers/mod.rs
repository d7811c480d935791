//! Driving capture policies.
//!
//! Drivers propose the capture range each cycle from their own buffer
//! contents; followers then decide readiness relative to it.

mod batch;
mod chunk;
mod next;
mod throttled;

pub use batch::Batch;
pub use chunk::Chunk;
pub use next::Next;
pub use throttled::Throttled;
