//! Pipeline blueprint contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::StreamId;

/// Convert a millisecond duration from configuration to nanosecond ticks.
pub fn millis_to_nanos(millis: f64) -> i64 {
    (millis * 1_000_000.0).round() as i64
}

/// Top-level pipeline blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineBlueprint {
    /// Pipeline-wide settings.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// The driving stream.
    pub driver: DriverStream,

    /// Follower streams, in registration order.
    pub followers: Vec<FollowerStream>,

    /// Output sinks.
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Capture loop settings.
    #[serde(default)]
    pub capture: CaptureLoopConfig,
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Display name used in logs.
    pub name: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
        }
    }
}

/// Driver stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStream {
    /// Stream identifier.
    pub stream: StreamId,

    /// Driving capture policy.
    pub policy: DriverPolicyConfig,

    /// Queue configuration.
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Mock production rate (Hz), used by mock sources only.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

/// Follower stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerStream {
    /// Stream identifier.
    pub stream: StreamId,

    /// Following capture policy.
    pub policy: FollowerPolicyConfig,

    /// Queue configuration.
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Mock production rate (Hz), used by mock sources only.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

fn default_rate_hz() -> f64 {
    10.0
}

/// Driving policy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverPolicyConfig {
    /// Emit the oldest element, one per cycle.
    Next,
    /// Like `next`, but skip elements arriving sooner than the period.
    Throttled { period_ms: f64 },
    /// Emit fixed-size chunks of the oldest elements.
    Chunk { size: usize },
    /// Emit all elements inside a fixed-width window.
    Batch { period_ms: f64 },
}

/// Following policy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FollowerPolicyConfig {
    /// Unconditionally emit everything before the shifted upper bound.
    AnyBefore {
        #[serde(default)]
        delay_ms: f64,
    },
    /// Emit everything before the shifted upper bound once it is confirmed.
    Before {
        #[serde(default)]
        delay_ms: f64,
    },
    /// Emit the closest element before the shifted lower bound.
    ClosestBefore {
        period_ms: f64,
        #[serde(default)]
        delay_ms: f64,
    },
    /// Emit an interval bracketing the driving range.
    Ranged {
        #[serde(default)]
        delay_ms: f64,
    },
    /// Emit the element nearest the upper bound within a tolerance.
    Matched { tolerance_ms: f64 },
    /// Emit the most recent element at or before the upper bound.
    Latched,
}

/// Queue configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Maximum buffered dispatches (`0` = unbounded).
    pub capacity: usize,

    /// Behavior when a bounded queue is full.
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            overflow: OverflowPolicy::EvictOldest,
        }
    }
}

/// Behavior of a bounded queue when a push would exceed capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest element to make room.
    #[default]
    EvictOldest,
    /// Fail the push with `CapacityExceeded` (strict-bounded mode).
    Reject,
}

/// Capture loop settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureLoopConfig {
    /// Poll interval between RETRY cycles, in milliseconds.
    pub poll_interval_ms: u64,

    /// Stop after this many committed captures (`0` = unlimited).
    pub max_captures: u64,
}

impl Default for CaptureLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            max_captures: 0,
        }
    }
}

/// Sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name (used for logging/metrics).
    pub name: String,

    /// Sink implementation.
    pub sink_type: SinkType,

    /// Worker queue capacity.
    #[serde(default = "default_sink_queue_capacity")]
    pub queue_capacity: usize,

    /// Implementation-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sink_queue_capacity() -> usize {
    64
}

/// Available sink implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log capture summaries via tracing.
    Log,
    /// Append captures as JSON lines to a file.
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_to_nanos() {
        assert_eq!(millis_to_nanos(1.0), 1_000_000);
        assert_eq!(millis_to_nanos(0.5), 500_000);
        assert_eq!(millis_to_nanos(0.0), 0);
    }

    #[test]
    fn test_policy_config_tagged_representation() {
        let json = r#"{"kind":"closest_before","period_ms":5.0,"delay_ms":1.0}"#;
        let policy: FollowerPolicyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            policy,
            FollowerPolicyConfig::ClosestBefore {
                period_ms: 5.0,
                delay_ms: 1.0
            }
        );

        let json = r#"{"kind":"next"}"#;
        let policy: DriverPolicyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(policy, DriverPolicyConfig::Next);
    }

    #[test]
    fn test_buffer_config_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.overflow, OverflowPolicy::EvictOldest);
    }
}
