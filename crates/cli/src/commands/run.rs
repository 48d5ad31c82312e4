//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_forwarder(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(outputs = config.outputs.len(), "Configuration loaded");

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        forwarder: config,
        input: args.input.clone(),
        batch_size: args.batch_size,
        max_metrics: if args.max_metrics == 0 {
            None
        } else {
            Some(args.max_metrics)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let stop = async move {
        tokio::select! {
            _ = shutdown_signal() => warn!("Received shutdown signal, stopping forwarder..."),
            _ = run_timeout(timeout) => warn!("Run timeout reached, stopping forwarder..."),
        }
    };

    info!("Starting forwarder...");
    let stats = pipeline.run(stop).await.context("Forwarding failed")?;

    info!(
        metrics_read = stats.metrics_read,
        batches = stats.batches,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.metrics_per_sec()),
        "Forwarder finished"
    );
    stats.print_summary();

    Ok(())
}

async fn run_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(t) => tokio::time::sleep(t).await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::ForwarderConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Version: {:?}", config.version);
    println!("\nOutputs ({}):", config.outputs.len());
    for output in &config.outputs {
        println!(
            "  - {} -> {} (service={}, format={:?}, delivery={:?})",
            output.name, output.endpoint, output.service, output.data_format, output.delivery
        );
        if let Some(ref identity) = output.identity {
            println!("      identity: {}", identity);
        }
    }
    println!();
}
