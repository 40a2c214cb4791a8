use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod error;
mod progress;
mod service;

use crate::config::StaticConfig;
use crate::service::MergeService;

// Re-export config crate types to avoid namespace collision
use ::config::{Config as ConfigBuilder, Environment, File};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting mdmerge service v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load static configuration (server binding, pipeline limits)
    let static_config: StaticConfig = ConfigBuilder::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("MDMERGE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        merge_batch_size = static_config.processing.merge_batch_size,
        "Configuration loaded"
    );

    let addr = format!(
        "{}:{}",
        static_config.server.host, static_config.server.port
    );

    // Initialize the service and its progress registry
    let service = Arc::new(MergeService::new(static_config));

    // Build the router
    let app = api::router(service);

    // Start the server
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mdmerge_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
