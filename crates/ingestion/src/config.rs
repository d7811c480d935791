//! Backpressure configuration and ingestion metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-source backpressure configuration.
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Capacity of the channel between a source and its pump.
    pub channel_capacity: usize,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}

/// Shared counters across all ingestion pumps.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Packets received from sources
    received: AtomicU64,
    /// Packets accepted by a captor queue
    injected: AtomicU64,
    /// Packets rejected for out-of-order stamps
    rejected: AtomicU64,
    /// Packets dropped on a contended polling lock
    contended: AtomicU64,
    /// Packets dropped because the source channel was full
    backpressure_dropped: AtomicU64,
}

impl IngestionMetrics {
    /// New zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_injected(&self) {
        self.injected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_contended(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_backpressure_drop(&self) {
        self.backpressure_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Packets received from sources so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Packets accepted by captor queues so far.
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::Relaxed)
    }

    /// Packets rejected for out-of-order stamps so far.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters.
    pub fn snapshot(&self) -> IngestionSnapshot {
        IngestionSnapshot {
            received: self.received.load(Ordering::Relaxed),
            injected: self.injected.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            backpressure_dropped: self.backpressure_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of ingestion counters (for reporting).
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionSnapshot {
    pub received: u64,
    pub injected: u64,
    pub rejected: u64,
    pub contended: u64,
    pub backpressure_dropped: u64,
}
