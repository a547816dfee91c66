//! microdemo relay
//!
//! Moves queued submissions into the object store.

use clap::Parser;
use microdemo_aws::{load_sdk_config, S3Store, SqsQueue};
use microdemo_core::Settings;
use microdemo_relay::{PollOutcome, Relay};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "microdemo-relay")]
#[command(about = "Persist queued submissions to the object store", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./microdemo.toml when present)
    #[arg(short, long, env = "MICRODEMO_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single iteration and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MICRODEMO_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "microdemo_relay={level},microdemo_aws={level},microdemo_core={level}",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(args.config.as_deref())?;

    info!("Starting microdemo relay...");
    info!("  Region: {}", settings.aws.region);
    info!("  Queue: {}", settings.queue.url);
    info!("  Bucket: {}", settings.store.bucket);
    if let Some(endpoint) = &settings.aws.endpoint_url {
        info!("  Endpoint: {}", endpoint);
    }

    let sdk = load_sdk_config(&settings.aws).await;
    let queue = Arc::new(SqsQueue::new(&sdk, settings.queue.clone()));
    let store = Arc::new(S3Store::new(&sdk, &settings.aws, settings.store.clone()));

    let relay = Relay::new(queue, store, settings.relay.clone());

    if args.once {
        let outcome = relay.poll_once().await;
        info!(outcome = outcome.label(), "Single iteration finished");
        if let PollOutcome::DependencyError { stage, error } = outcome {
            anyhow::bail!("{stage} failed: {error}");
        }
        return Ok(());
    }

    relay.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
