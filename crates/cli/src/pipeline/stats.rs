//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::CaptureMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total captures successfully committed
    pub captures_committed: u64,

    /// Total cycles aborted
    pub cycles_aborted: u64,

    /// Total packets received from sources
    pub packets_received: u64,

    /// Total packets accepted by captor queues
    pub packets_injected: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of streams that were active
    pub active_streams: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Capture metrics aggregator
    pub capture_metrics: CaptureMetricsAggregator,
}

impl PipelineStats {
    /// Calculate captures per second throughput
    pub fn cps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.captures_committed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate abort rate as percentage of decided cycles
    #[allow(dead_code)]
    pub fn abort_rate(&self) -> f64 {
        let total = self.captures_committed + self.cycles_aborted;
        if total > 0 {
            (self.cycles_aborted as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Captures committed: {}", self.captures_committed);
        println!("  Cycles aborted: {}", self.cycles_aborted);
        println!("  Packets received: {}", self.packets_received);
        println!("  Packets injected: {}", self.packets_injected);
        println!("  Captures/s: {:.2}", self.cps());
        println!("  Active streams: {}", self.active_streams);
        println!("  Active sinks: {}", self.active_sinks);

        let summary = self.capture_metrics.summary();

        println!("\nCapture Metrics");
        println!("  Retry cycles: {}", summary.total_retries);
        println!(
            "  Aborted cycles: {} ({:.2}%)",
            summary.total_aborts, summary.abort_rate
        );
        println!("  Dropped packets: {}", summary.total_dropped);
        println!("  Rejected packets: {}", summary.total_rejected);
        println!("  Retries per capture: {}", summary.retries_per_capture);

        if !summary.stream_empty_counts.is_empty() {
            println!("\nEmpty Contributions");
            for (stream, count) in &summary.stream_empty_counts {
                println!("  {}: {}", stream, count);
            }
        }

        println!();
    }
}
