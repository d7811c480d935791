//! Mock dispatch source
//!
//! For testing and demo pipelines without a live feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_channel::{bounded, Receiver};
use bytes::Bytes;
use contracts::{DispatchCallback, DispatchSource, StreamId, StreamPacket};
use tracing::{debug, trace};

use crate::config::IngestionMetrics;

/// Mock source configuration.
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// Stream to produce for.
    pub stream_id: StreamId,

    /// Production rate (Hz).
    pub rate_hz: f64,

    /// Payload size in bytes.
    pub payload_bytes: usize,

    /// Stamp of the first packet (nanosecond ticks).
    pub start_stamp: i64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            stream_id: "mock_stream".into(),
            rate_hz: 10.0,
            payload_bytes: 16,
            start_stamp: 0,
        }
    }
}

/// Mock dispatch source.
///
/// Produces deterministic stamps (`start_stamp + seq * period`) at the
/// configured rate, so pipeline tests do not depend on the wall clock.
pub struct MockDispatchSource {
    config: MockSourceConfig,
    running: Arc<AtomicBool>,
}

impl MockDispatchSource {
    /// Create a new mock source.
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shorthand: a source for `stream_id` at `rate_hz`.
    pub fn with_rate(stream_id: &str, rate_hz: f64) -> Self {
        Self::new(MockSourceConfig {
            stream_id: stream_id.into(),
            rate_hz,
            ..Default::default()
        })
    }

    fn period_nanos(&self) -> i64 {
        (1_000_000_000.0 / self.config.rate_hz.max(f64::MIN_POSITIVE)).round() as i64
    }

    fn make_packet(config: &MockSourceConfig, seq: u64, period_nanos: i64) -> StreamPacket {
        let stamp = config.start_stamp + seq as i64 * period_nanos;
        StreamPacket::new(
            config.stream_id.clone(),
            stamp,
            Bytes::from(vec![0u8; config.payload_bytes]),
        )
        .with_seq(seq)
    }

    /// Start producing into a bounded channel; returns the receiver.
    ///
    /// Packets are dropped (and counted) when the channel is full.
    pub fn start(
        &self,
        channel_capacity: usize,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> Receiver<StreamPacket> {
        let (tx, rx) = bounded(channel_capacity);
        let config = self.config.clone();
        let running = self.running.clone();
        let metrics = metrics.unwrap_or_default();
        let period_nanos = self.period_nanos();

        running.store(true, Ordering::SeqCst);

        thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(f64::MIN_POSITIVE));
            let mut seq: u64 = 0;

            debug!(
                stream_id = %config.stream_id,
                rate_hz = config.rate_hz,
                "mock source started"
            );

            while running.load(Ordering::SeqCst) {
                let packet = Self::make_packet(&config, seq, period_nanos);
                trace!(stream_id = %config.stream_id, stamp = packet.stamp, "mock packet");

                match tx.try_send(packet) {
                    Ok(()) => {}
                    Err(async_channel::TrySendError::Full(_)) => {
                        metrics.record_backpressure_drop();
                    }
                    Err(async_channel::TrySendError::Closed(_)) => break,
                }

                seq += 1;
                thread::sleep(interval);
            }

            debug!(stream_id = %config.stream_id, packets = seq, "mock source stopped");
        });

        rx
    }
}

impl DispatchSource for MockDispatchSource {
    fn stream_id(&self) -> &StreamId {
        &self.config.stream_id
    }

    fn listen(&self, callback: DispatchCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let running = self.running.clone();
        let period_nanos = self.period_nanos();

        thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(f64::MIN_POSITIVE));
            let mut seq: u64 = 0;

            while running.load(Ordering::SeqCst) {
                callback(Self::make_packet(&config, seq, period_nanos));
                seq += 1;
                thread::sleep(interval);
            }
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_produces_ordered_stamps() {
        let source = MockDispatchSource::with_rate("imu", 1000.0);
        let rx = source.start(64, None);

        let mut stamps = Vec::new();
        while stamps.len() < 5 {
            stamps.push(rx.recv_blocking().unwrap().stamp);
        }
        source.stop();

        for pair in stamps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_listen_is_idempotent() {
        let source = MockDispatchSource::with_rate("imu", 1000.0);
        let (tx, rx) = bounded(64);
        let tx2 = tx.clone();

        source.listen(Arc::new(move |packet| {
            let _ = tx.try_send(packet);
        }));
        // Second listen must not start another producer.
        source.listen(Arc::new(move |packet| {
            let _ = tx2.try_send(packet);
        }));

        let first = rx.recv_blocking().unwrap();
        assert_eq!(first.stream_id, "imu");
        source.stop();
        assert!(!source.is_listening());
    }
}
