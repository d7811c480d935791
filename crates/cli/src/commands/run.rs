//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        pipeline = %blueprint.pipeline.name,
        driver = %blueprint.driver.stream,
        followers = blueprint.followers.len(),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Resolve capture limit: CLI override first, then blueprint
    let max_captures = if args.max_captures > 0 {
        Some(args.max_captures)
    } else if blueprint.capture.max_captures > 0 {
        Some(blueprint.capture.max_captures)
    } else {
        None
    };

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_captures,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        captures = stats.captures_committed,
                        aborted = stats.cycles_aborted,
                        duration_secs = stats.duration.as_secs_f64(),
                        cps = format!("{:.2}", stats.cps()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Stream Syncer finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::PipelineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Pipeline: {}", blueprint.pipeline.name);

    println!("\nDriver:");
    println!(
        "  - {} ({:?}) @ {} Hz",
        blueprint.driver.stream, blueprint.driver.policy, blueprint.driver.rate_hz
    );

    println!("\nFollowers ({}):", blueprint.followers.len());
    for follower in &blueprint.followers {
        println!(
            "  - {} ({:?}) @ {} Hz",
            follower.stream, follower.policy, follower.rate_hz
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nCapture Loop:");
    println!("  Poll interval: {}ms", blueprint.capture.poll_interval_ms);
    if blueprint.capture.max_captures > 0 {
        println!("  Max captures: {}", blueprint.capture.max_captures);
    }

    println!();
}
