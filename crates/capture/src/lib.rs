//! # Capture
//!
//! Stamped-stream capture core: the dispatch queue, the capture policy
//! contract, and the driver/follower policy families.
//!
//! Every policy exposes the same four operations (`capture`,
//! `dry_capture`, `abort`, `reset`) over its exclusively-owned queue.
//! Drivers produce a [`CaptureRange`]; followers consume it and decide
//! readiness relative to it. A [`Captor`] wraps a policy with a lock
//! policy so producers can inject from other tasks.
//!
//! ## 使用示例
//!
//! ```
//! use capture::drivers::Next;
//! use capture::{CapturePolicy, CaptureRange, DriverPolicy, State};
//! use contracts::Dispatch;
//!
//! let mut driver: Next<Dispatch<i64, &str>> = Next::new();
//! driver.queue_mut().push(Dispatch::new(1, "a")).unwrap();
//!
//! let mut range = CaptureRange::unset();
//! let mut out = Vec::new();
//! assert_eq!(driver.capture(&mut out, &mut range), State::Primed);
//! assert_eq!(range.lower_stamp, 1);
//! ```

mod captor;
pub mod drivers;
pub mod followers;
mod queue;

pub use captor::{
    CapturePolicy, Captor, DriverCaptor, DriverPolicy, FollowerCaptor, FollowerPolicy, Injector,
    PacketInjector,
};
pub use queue::DispatchQueue;

// Re-export contracts types used on every call path.
pub use contracts::{CaptorStats, CaptureError, CaptureRange, DispatchSink, State};
