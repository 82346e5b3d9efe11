#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use pricegrid_adapter::{pricing_router, AdapterConfig, PricingAdapterRuntime};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pricegrid_http")]
#[command(about = "Pricing matrix persistence endpoint")]
struct Cli {
    /// TCP address to bind (overrides PRICEGRID_HTTP_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Location of the durable pricing record (overrides PRICEGRID_RECORD_PATH)
    #[arg(long)]
    record_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pricegrid_adapter=info,pricegrid_http=info,pricegrid_storage=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AdapterConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(record_path) = cli.record_path {
        config.record_path = record_path;
    }

    let runtime = PricingAdapterRuntime::for_record_path(config.record_path.clone());
    let app = pricing_router(runtime).layer(TraceLayer::new_for_http());

    info!(
        record_path = %config.record_path.display(),
        "pricegrid_http listening on http://{}",
        config.bind
    );
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("pricegrid_http stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
