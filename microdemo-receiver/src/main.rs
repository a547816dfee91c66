//! microdemo receiver
//!
//! Validates submissions and forwards them to the queue.

use clap::Parser;
use microdemo_aws::{load_sdk_config, SqsQueue};
use microdemo_core::Settings;
use microdemo_receiver::{create_router, ReceiverState, SharedSecret};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "microdemo-receiver")]
#[command(about = "Validate submissions and enqueue them", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./microdemo.toml when present)
    #[arg(short, long, env = "MICRODEMO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides receiver.port)
    #[arg(short, long, env = "MICRODEMO_PORT")]
    port: Option<u16>,

    /// Host to bind to (overrides receiver.host)
    #[arg(long, env = "MICRODEMO_HOST")]
    host: Option<String>,

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
                    "microdemo_receiver={level},microdemo_aws={level},microdemo_core={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        settings.receiver.port = port;
    }
    if let Some(host) = args.host {
        settings.receiver.host = host;
    }

    let secret = SharedSecret::new(settings.receiver.token()?);

    info!("Starting microdemo receiver...");
    info!("  Region: {}", settings.aws.region);
    info!("  Queue: {}", settings.queue.url);
    if let Some(endpoint) = &settings.aws.endpoint_url {
        info!("  Endpoint: {}", endpoint);
    }

    let sdk = load_sdk_config(&settings.aws).await;
    let queue = Arc::new(SqsQueue::new(&sdk, settings.queue.clone()));

    let app = create_router(ReceiverState::new(queue, secret));

    let addr: SocketAddr = format!("{}:{}", settings.receiver.host, settings.receiver.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
