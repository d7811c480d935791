//! LogSink - logs capture summaries via tracing

use contracts::{CaptureError, CaptureSink, StreamPacket, SyncedCapture};
use tracing::{info, instrument};

/// Sink that logs capture summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_capture_summary(&self, capture: &SyncedCapture<StreamPacket>) {
        let dispatches: usize = capture.streams.values().map(Vec::len).sum();

        info!(
            sink = %self.name,
            seq = capture.seq,
            lower_stamp = capture.range.lower_stamp,
            upper_stamp = capture.range.upper_stamp,
            streams = capture.streams.len(),
            dispatches,
            retries = capture.meta.retries,
            aborts = capture.meta.aborts,
            "SyncedCapture received"
        );
    }
}

impl CaptureSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, capture),
        fields(sink = %self.name, seq = capture.seq)
    )]
    async fn write(&mut self, capture: &SyncedCapture<StreamPacket>) -> Result<(), CaptureError> {
        self.log_capture_summary(capture);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), CaptureError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), CaptureError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CaptureMeta, CaptureRange};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let capture = SyncedCapture {
            seq: 1,
            range: CaptureRange::new(0, 0),
            streams: HashMap::new(),
            meta: CaptureMeta::default(),
        };

        let result = sink.write(&capture).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
