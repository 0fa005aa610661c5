use anyhow::Context;
use biomarker_backend::config::{DEFAULT_ENV_FILE, EnvConfig};
use biomarker_backend::service::build_router;
use biomarker_backend::storage::memory::DataStorage;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "biomarker-backend", version, about = "Digital biomarker data-collection backend")]
struct Args {
    /// JSON environment file
    #[arg(long, env = "WORKING_ENV")]
    env_file: Option<PathBuf>,

    /// Listen address, overrides the environment file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Snapshot file, overrides the environment file
    #[arg(long)]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_path = EnvConfig::resolve_path(args.env_file.as_deref());
    let mut config = match &env_path {
        Some(path) => EnvConfig::load_from(path)?,
        None => EnvConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting service...");
    match &env_path {
        Some(path) => tracing::info!("Loaded environment config: {}", path.display()),
        None => tracing::warn!(
            "Environment file {} not found, using defaults",
            DEFAULT_ENV_FILE
        ),
    }
    tracing::debug!(
        bind = %config.bind,
        data_file = %config.data_file.display(),
        persist_on_shutdown = config.persist_on_shutdown,
        "Effective config"
    );

    // 1. Storage layer:
    let storage = Arc::new(DataStorage::new(config.data_file.clone()));
    storage
        .load_data()
        .await
        .with_context(|| format!("Failed to load snapshot {}", config.data_file.display()))?;

    // 2. HTTP Router:
    let app = build_router(storage.clone(), &config);

    // 3. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 4. Flush on shutdown:
    if config.persist_on_shutdown {
        storage
            .store_data()
            .await
            .context("Failed to store snapshot on shutdown")?;
    }

    tracing::info!("Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
