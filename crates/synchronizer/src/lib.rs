//! # Synchronizer
//!
//! Composes one driver captor with N follower captors and runs the
//! capture protocol across them: the driver proposes a range, followers
//! react, and the cycle commits, retries, or aborts as a unit.
//!
//! Outputs are buffered per participant and flushed only when every
//! participant is PRIMED, so a retried cycle never leaks partial data
//! and no lock is ever held across a sink write.

mod assemble;
mod sync;

pub use assemble::{assemble, AssembledPipeline};
pub use sync::{CycleOutcome, DryOutcome, Synchronizer, SynchronizerBuilder};

// Re-export contracts types used on every call path.
pub use contracts::{CaptureError, CaptureRange, State, SyncedCapture};
