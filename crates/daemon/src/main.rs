//! Attention streaming daemon
//!
//! Thin consumer over the headset core: scans (or goes straight to the
//! synthetic source), starts the stream, and logs the attention score
//! until interrupted. This binary carries no radio backend: it drives
//! the coordinator through the in-process transport, so every run
//! exercises the synthetic fallback exactly the way a failed scan would
//! in the field. A BLE adapter plugs in at the `Transport` seam.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use headset::transport::mock::MockTransport;
use headset::StreamCoordinator;
use headset_types::HeadsetConfig;

#[derive(Parser)]
#[command(name = "attention_daemon", about = "Attention score streaming daemon")]
struct Args {
    /// Stream from the synthetic source without scanning for hardware
    #[arg(long)]
    synthetic: bool,

    /// Connect to a specific device identifier instead of the first scan
    /// result
    #[arg(long)]
    device: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attention_daemon=info,headset=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("could not read configuration at {}", path.display()))?;
            serde_json::from_str::<HeadsetConfig>(&contents)
                .with_context(|| format!("could not parse configuration at {}", path.display()))?
        }
        None => HeadsetConfig::default(),
    };

    let transport = Arc::new(MockTransport::new());
    let mut coordinator = StreamCoordinator::new(transport, config.clone());

    if args.synthetic {
        info!("synthetic source requested");
        coordinator.enable_synthetic_mode();
    } else {
        match coordinator.scan().await {
            Ok(devices) if !devices.is_empty() => {
                let target = args
                    .device
                    .clone()
                    .unwrap_or_else(|| devices[0].id.clone());
                info!(device = %target, "connecting");
                if let Err(e) = coordinator.connect(&target).await {
                    // The coordinator has already fallen back; the stream
                    // below is synthetic.
                    tracing::warn!(error = %e, "connect failed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "scan failed"),
        }
    }

    // Log roughly once a second at the default 20 Hz tick rate.
    let ticks_per_log = (1_000 / config.tick_interval_ms.max(1)).max(1);
    coordinator
        .start_streaming(Box::new(move |sample| {
            if sample.tick % ticks_per_log == 0 {
                info!(
                    score = sample.attention_score,
                    tp9 = sample.raw_eeg[0],
                    af7 = sample.raw_eeg[1],
                    af8 = sample.raw_eeg[2],
                    tp10 = sample.raw_eeg[3],
                    "sample"
                );
            }
        }))
        .await;

    info!(
        synthetic = coordinator.is_synthetic_mode(),
        "streaming; press ctrl-c to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutdown signal received, stopping stream");
    coordinator.stop_streaming().await;
    Ok(())
}
