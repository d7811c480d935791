//! 配置校验：拒绝明显不可运行的 blueprint。

use std::collections::HashSet;

use contracts::{
    CaptureError, DriverPolicyConfig, FollowerPolicyConfig, PipelineBlueprint, SinkConfig,
};

/// 校验 blueprint 合法性
pub(crate) fn validate(blueprint: &PipelineBlueprint) -> Result<(), CaptureError> {
    validate_streams(blueprint)?;
    validate_driver_policy(&blueprint.driver.policy)?;
    for follower in &blueprint.followers {
        validate_follower_policy(&follower.stream, &follower.policy)?;
    }
    validate_rates(blueprint)?;
    validate_sinks(&blueprint.sinks)?;
    validate_capture_loop(blueprint)
}

fn validate_streams(blueprint: &PipelineBlueprint) -> Result<(), CaptureError> {
    if blueprint.driver.stream.is_empty() {
        return Err(CaptureError::config_validation(
            "driver.stream",
            "stream id must not be empty",
        ));
    }

    if blueprint.followers.is_empty() {
        return Err(CaptureError::config_validation(
            "followers",
            "at least one follower is required",
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(blueprint.driver.stream.as_str());

    for follower in &blueprint.followers {
        if follower.stream.is_empty() {
            return Err(CaptureError::config_validation(
                "followers.stream",
                "stream id must not be empty",
            ));
        }
        if !seen.insert(follower.stream.as_str()) {
            return Err(CaptureError::config_validation(
                "followers.stream",
                format!("duplicate stream id '{}'", follower.stream),
            ));
        }
    }

    Ok(())
}

fn validate_duration(field: &str, millis: f64, strictly_positive: bool) -> Result<(), CaptureError> {
    if !millis.is_finite() {
        return Err(CaptureError::config_validation(
            field,
            "duration must be finite",
        ));
    }
    if millis < 0.0 {
        return Err(CaptureError::config_validation(
            field,
            "duration must not be negative",
        ));
    }
    if strictly_positive && millis == 0.0 {
        return Err(CaptureError::config_validation(
            field,
            "duration must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_driver_policy(policy: &DriverPolicyConfig) -> Result<(), CaptureError> {
    match policy {
        DriverPolicyConfig::Next => Ok(()),
        DriverPolicyConfig::Throttled { period_ms } => {
            validate_duration("driver.policy.period_ms", *period_ms, true)
        }
        DriverPolicyConfig::Chunk { size } => {
            if *size == 0 {
                Err(CaptureError::config_validation(
                    "driver.policy.size",
                    "chunk size must be at least 1",
                ))
            } else {
                Ok(())
            }
        }
        DriverPolicyConfig::Batch { period_ms } => {
            validate_duration("driver.policy.period_ms", *period_ms, true)
        }
    }
}

fn validate_follower_policy(
    stream: &str,
    policy: &FollowerPolicyConfig,
) -> Result<(), CaptureError> {
    let field = |name: &str| format!("followers[{stream}].policy.{name}");
    match policy {
        FollowerPolicyConfig::AnyBefore { delay_ms } | FollowerPolicyConfig::Before { delay_ms } => {
            validate_duration(&field("delay_ms"), *delay_ms, false)
        }
        FollowerPolicyConfig::ClosestBefore {
            period_ms,
            delay_ms,
        } => {
            validate_duration(&field("period_ms"), *period_ms, true)?;
            validate_duration(&field("delay_ms"), *delay_ms, false)
        }
        FollowerPolicyConfig::Ranged { delay_ms } => {
            validate_duration(&field("delay_ms"), *delay_ms, false)
        }
        FollowerPolicyConfig::Matched { tolerance_ms } => {
            validate_duration(&field("tolerance_ms"), *tolerance_ms, false)
        }
        FollowerPolicyConfig::Latched => Ok(()),
    }
}

fn validate_rates(blueprint: &PipelineBlueprint) -> Result<(), CaptureError> {
    let mut rates = vec![("driver.rate_hz".to_string(), blueprint.driver.rate_hz)];
    for follower in &blueprint.followers {
        rates.push((
            format!("followers[{}].rate_hz", follower.stream),
            follower.rate_hz,
        ));
    }

    for (field, rate) in rates {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CaptureError::config_validation(
                field,
                "rate must be a positive, finite frequency",
            ));
        }
    }
    Ok(())
}

fn validate_sinks(sinks: &[SinkConfig]) -> Result<(), CaptureError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for sink in sinks {
        if sink.name.is_empty() {
            return Err(CaptureError::config_validation(
                "sinks.name",
                "sink name must not be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(CaptureError::config_validation(
                "sinks.name",
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(CaptureError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue capacity must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_capture_loop(blueprint: &PipelineBlueprint) -> Result<(), CaptureError> {
    if blueprint.capture.poll_interval_ms == 0 {
        return Err(CaptureError::config_validation(
            "capture.poll_interval_ms",
            "poll interval must be at least 1ms",
        ));
    }
    Ok(())
}
