mod cli;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use filesd::{render_text, DiscoveryMetrics, FileDiscovery, TargetGroup, TimestampRegistry};

use cli::Args;

/// Logs go to stderr so stdout carries only target group updates.
/// notify logs through `log`, which is bridged into tracing.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr),
    );
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    let log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = tracing_log::LogTracer::init_with_filter(log_level) {
        eprintln!("Failed to bridge log records: {}", e);
    }
}

fn write_batch(out: &mut impl Write, batch: &[TargetGroup]) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, batch)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn build_discovery(
    args: &Args,
    registry: &Arc<TimestampRegistry>,
    metrics: &Arc<DiscoveryMetrics>,
) -> filesd::Result<FileDiscovery> {
    let config = args.discovery_config()?;
    let discovery = FileDiscovery::new(&config, Arc::clone(registry), Arc::clone(metrics))?;
    Ok(discovery)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting filesd v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(TimestampRegistry::new());
    let metrics = Arc::new(DiscoveryMetrics::new());
    let discovery = match build_discovery(&args, &registry, &metrics) {
        Ok(discovery) => discovery,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    }

    let (tx, mut rx) = mpsc::channel(usize::from(args.channel_capacity));
    let handle = discovery.spawn(tx, cancel.clone());

    // tokio intervals panic on a zero period; the branch is disabled instead.
    let metrics_enabled = !args.metrics_interval.is_zero();
    let period = if metrics_enabled {
        args.metrics_interval
    } else {
        Duration::from_secs(3600)
    };
    let mut metrics_tick = tokio::time::interval_at(Instant::now() + period, period);
    metrics_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stdout = std::io::stdout().lock();
    let mut code = ExitCode::SUCCESS;
    loop {
        tokio::select! {
            batch = rx.recv() => {
                let Some(batch) = batch else { break };
                if let Err(e) = write_batch(&mut stdout, &batch) {
                    error!(error = %e, "Failed to write update");
                    code = ExitCode::FAILURE;
                    cancel.cancel();
                    break;
                }
            }
            _ = metrics_tick.tick(), if metrics_enabled => {
                info!("metrics:\n{}", render_text(&metrics, &registry));
            }
        }
    }
    drop(rx);

    if let Err(e) = handle.await {
        error!(error = %e, "Discovery task failed");
        code = ExitCode::FAILURE;
    }
    info!("filesd stopped");
    code
}
