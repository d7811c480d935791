//! Dispatcher - main loop for fan-out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SinkConfig, SinkType, StreamPacket, SyncedCapture};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<SyncedCapture<StreamPacket>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(
        config: DispatcherConfig,
        input_rx: mpsc::Receiver<SyncedCapture<StreamPacket>>,
    ) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config)?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    fn initialize_handles(config: &DispatcherConfig) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config)?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Convenience constructor used by tests and the CLI
pub fn create_dispatcher(
    sinks: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<SyncedCapture<StreamPacket>>,
) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(DispatcherConfig { sinks }, input_rx).build()
}

/// The main Dispatcher that fans out captures to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<SyncedCapture<StreamPacket>>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<SyncedCapture<StreamPacket>>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes captures from input and fans out to all sinks.
    /// Returns when the input channel is closed.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut capture_count: u64 = 0;

        while let Some(capture) = self.input_rx.recv().await {
            capture_count += 1;
            self.dispatch_capture(&capture);

            if capture_count.is_multiple_of(100) {
                debug!(captures = capture_count, "Dispatcher progress");
            }
        }

        info!(
            captures = capture_count,
            "Dispatcher input closed, shutting down"
        );

        Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    fn dispatch_capture(&self, capture: &SyncedCapture<StreamPacket>) {
        for handle in &self.handles {
            handle.try_send(capture.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CaptureMeta, CaptureRange};
    use std::collections::HashMap;

    fn sample_capture(seq: u64) -> SyncedCapture<StreamPacket> {
        SyncedCapture {
            seq,
            range: CaptureRange::new(0, 0),
            streams: HashMap::new(),
            meta: CaptureMeta::default(),
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fans_out_to_log_sink() {
        let (tx, rx) = mpsc::channel(16);
        let sinks = vec![SinkConfig {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 16,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(sinks, rx).unwrap();
        let handle = dispatcher.spawn();

        for seq in 1..=3 {
            tx.send(sample_capture(seq)).await.unwrap();
        }
        drop(tx);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatcher_without_sinks_drains_input() {
        let (tx, rx) = mpsc::channel(4);
        let dispatcher = create_dispatcher(Vec::new(), rx).unwrap();
        let handle = dispatcher.spawn();

        tx.send(sample_capture(1)).await.unwrap();
        drop(tx);

        handle.await.unwrap();
    }
}
