//! Pipeline orchestrator - coordinates all components.
//!
//! Wires mock sources through the ingestion pumps into the assembled
//! captors, drives the capture loop, and fans committed captures out to
//! the configured sinks.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::PipelineBlueprint;
use ingestion::{BackpressureConfig, IngestionPipeline, MockDispatchSource};
use observability::record_capture_metrics;
use synchronizer::{assemble, AssembledPipeline, CycleOutcome};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The pipeline blueprint
    pub blueprint: PipelineBlueprint,

    /// Maximum number of captures to commit (None = unlimited)
    pub max_captures: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Assemble captors + synchronizer
        info!(pipeline = %blueprint.pipeline.name, "Assembling capture pipeline...");
        let AssembledPipeline {
            mut synchronizer,
            injectors,
        } = assemble(blueprint).context("Failed to assemble pipeline")?;

        info!(
            driver = %synchronizer.driver_id(),
            followers = synchronizer.follower_count(),
            "Capture pipeline assembled"
        );

        // Setup Ingestion (mock sources, one per stream)
        info!("Setting up ingestion pipeline...");
        let mut ingestion = IngestionPipeline::new(BackpressureConfig {
            channel_capacity: self.config.buffer_size,
        });

        let mut stream_rates = vec![(
            blueprint.driver.stream.clone(),
            blueprint.driver.rate_hz,
        )];
        for follower in &blueprint.followers {
            stream_rates.push((follower.stream.clone(), follower.rate_hz));
        }

        for (stream, rate_hz) in &stream_rates {
            let injector = injectors
                .get(stream)
                .with_context(|| format!("No injector for stream '{stream}'"))?;
            let source = MockDispatchSource::with_rate(stream, *rate_hz);
            ingestion.register(Box::new(source), injector.clone(), None);
        }

        let active_streams = ingestion.source_count();
        info!(active_streams, "Ingestion pipeline configured");

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (capture_tx, capture_rx) = mpsc::channel(self.config.buffer_size);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - synced captures will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), capture_rx)
            .context("Failed to create dispatcher")?;

        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Start Pipeline
        info!("Starting ingestion pumps...");
        let _pump_tasks = ingestion.start_all();

        let max_captures = self.config.max_captures;
        let poll_interval = Duration::from_millis(blueprint.capture.poll_interval_ms);

        info!(max_captures = ?max_captures, "Pipeline running (mock sources)");

        // Capture loop
        let capture_loop = async move {
            let mut stats = PipelineStats {
                active_streams,
                active_sinks,
                ..Default::default()
            };

            loop {
                match synchronizer.capture() {
                    Ok(CycleOutcome::Primed(capture)) => {
                        stats.captures_committed += 1;

                        // Record metrics from CaptureMeta
                        record_capture_metrics(&capture.meta, capture.seq);
                        stats.capture_metrics.update(&capture.meta);

                        info!(
                            seq = capture.seq,
                            lower_stamp = capture.range.lower_stamp,
                            upper_stamp = capture.range.upper_stamp,
                            streams = capture.streams.len(),
                            retries = capture.meta.retries,
                            "Synced capture produced"
                        );

                        if capture_tx.send(capture).await.is_err() {
                            warn!("Dispatcher channel closed");
                            break;
                        }

                        // Check max captures limit
                        if let Some(max) = max_captures {
                            if stats.captures_committed >= max {
                                info!(captures = stats.captures_committed, "Reached max captures limit");
                                break;
                            }
                        }
                    }
                    Ok(CycleOutcome::Retry) => {
                        tokio::time::sleep(poll_interval).await;
                    }
                    Ok(CycleOutcome::Abort { frontier }) => {
                        stats.cycles_aborted += 1;
                        debug!(frontier, "Cycle aborted; queues advanced");
                    }
                    Err(e) => {
                        error!(error = %e, "Capture cycle failed");
                        break;
                    }
                }
            }

            stats
        };

        // Run with optional timeout
        let stats = if let Some(timeout) = self.config.timeout {
            match tokio::time::timeout(timeout, capture_loop).await {
                Ok(stats) => stats,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                    PipelineStats {
                        active_streams,
                        active_sinks,
                        ..Default::default()
                    }
                }
            }
        } else {
            capture_loop.await
        };

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();

        // Wait for the dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        let mut final_stats = stats;
        final_stats.duration = start_time.elapsed();
        let snapshot = ingestion.metrics().snapshot();
        final_stats.packets_received = snapshot.received;
        final_stats.packets_injected = snapshot.injected;

        info!(
            duration_secs = final_stats.duration.as_secs_f64(),
            cps = format!("{:.2}", final_stats.cps()),
            "Pipeline shutdown complete"
        );

        Ok(final_stats)
    }
}
