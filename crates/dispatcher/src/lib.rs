//! # Dispatcher
//!
//! Capture dispatch module.
//!
//! Responsibilities:
//! - Consume `SyncedCapture`
//! - Fan-out to multiple sinks
//! - Isolate slow sinks without blocking the capture loop

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{CaptureSink, StreamPacket, SyncedCapture};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink};
