//! SyncedCapture - Synchronizer output
//!
//! One committed capture cycle across all participating streams.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{CaptureRange, Stamped, StreamId};

/// Synchronized capture.
///
/// Contains the dispatches every participant contributed for one
/// committed capture range, keyed by stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "D: Serialize, D::Stamp: Serialize",
    deserialize = "D: serde::de::DeserializeOwned, D::Stamp: serde::de::DeserializeOwned"
))]
pub struct SyncedCapture<D: Stamped> {
    /// Capture sequence number (monotonically increasing).
    pub seq: u64,

    /// The committed capture range.
    pub range: CaptureRange<D::Stamp>,

    /// Captured dispatches per stream (driver included).
    pub streams: HashMap<StreamId, Vec<D>>,

    /// Capture metadata.
    pub meta: CaptureMeta,
}

/// Capture metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureMeta {
    /// Stream that drove the capture range.
    pub driver_stream: StreamId,

    /// RETRY cycles observed since the previous committed capture.
    pub retries: u32,

    /// ABORT cycles observed since the previous committed capture.
    pub aborts: u32,

    /// Number of dispatches contributed per stream.
    pub stream_counts: HashMap<StreamId, usize>,

    /// Capacity evictions across all captor queues so far.
    pub dropped_total: u64,

    /// Out-of-order rejections across all captor queues so far.
    pub rejected_total: u64,
}

/// Captor queue status (for diagnostics)
#[derive(Debug, Clone)]
pub struct CaptorStats<S> {
    /// Buffered dispatch count.
    pub depth: usize,

    /// Configured capacity (`None` = unbounded).
    pub capacity: Option<usize>,

    /// Capacity evictions so far.
    pub dropped: u64,

    /// Out-of-order rejections so far.
    pub rejected: u64,

    /// Oldest buffered stamp.
    pub oldest_stamp: Option<S>,

    /// Newest buffered stamp.
    pub newest_stamp: Option<S>,
}

impl<S> Default for CaptorStats<S> {
    fn default() -> Self {
        Self {
            depth: 0,
            capacity: None,
            dropped: 0,
            rejected: 0,
            oldest_stamp: None,
            newest_stamp: None,
        }
    }
}
