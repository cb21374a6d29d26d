//! audix-ml - machine sound analysis service
//!
//! Accepts WAV recordings of running machines, separates them into per-component
//! stems, scores each stem for anomalies and keeps the latest device health score.
//! Low health scores are published as alerts on the event stream.

use anyhow::{Context, Result};
use audix_common::config::{LoggingConfig, TomlConfig};
use audix_common::events::EventBus;
use audix_ml::config::{self as service_config, CliOverrides, ServiceConfig, DEFAULT_LOG_FILTER};
use audix_ml::db::{self, SqliteScoreStore};
use audix_ml::services::{RemoteClassifier, RemoteSeparator};
use audix_ml::workflow::Ingestor;
use audix_ml::{AppState, ServiceParts};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for audix-ml
#[derive(Parser, Debug)]
#[command(name = "audix-ml")]
#[command(about = "Machine sound anomaly analysis service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "AUDIX_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database (overrides AUDIX_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "AUDIX_HOST")]
    host: Option<String>,

    /// HTTP server port
    #[arg(short, long, env = "AUDIX_PORT")]
    port: Option<u16>,

    /// Base URL of the separation model server
    #[arg(long, env = "AUDIX_SEPARATOR_URL")]
    separator_url: Option<String>,

    /// Base URL of the classification model server
    #[arg(long, env = "AUDIX_CLASSIFIER_URL")]
    classifier_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging settings live in the config file; a load error is reported once tracing is up
    let loaded = TomlConfig::locate(args.config.as_deref()).and_then(|path| match path {
        Some(path) => Ok((TomlConfig::load_file(&path)?, Some(path))),
        None => Ok((TomlConfig::default(), None)),
    });
    let logging = loaded
        .as_ref()
        .map(|(toml_config, _)| toml_config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging)?;

    info!(
        "Starting audix-ml v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (toml_config, config_path) = loaded?;
    match &config_path {
        Some(path) => info!("Loaded configuration file: {}", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }

    let config = ServiceConfig::resolve(
        &CliOverrides {
            root_folder: args.root_folder,
            host: args.host,
            port: args.port,
            separator_url: args.separator_url,
            classifier_url: args.classifier_url,
        },
        &toml_config,
    )?;

    info!("Root folder: {}", config.root_folder.display());

    std::fs::create_dir_all(&config.staging_dir).with_context(|| {
        format!("Failed to create staging directory: {}", config.staging_dir.display())
    })?;

    info!("Database: {}", config.database_path.display());
    let db_pool = db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(256);

    let separator = RemoteSeparator::new(&config.models.separator_url, config.request_timeout())?;
    let classifier = RemoteClassifier::new(&config.models.classifier_url, config.request_timeout())?;
    info!("Separator: {}", separator.base_url());
    info!("Classifier: {}", classifier.base_url());

    let state = AppState::new(ServiceParts {
        separator: Arc::new(separator),
        classifier: Arc::new(classifier),
        scores: SqliteScoreStore::new(db_pool),
        event_bus,
        ingestor: Ingestor::new(config.sample_rate).with_staging_dir(&config.staging_dir),
        batch_concurrency: config.batch_concurrency,
        models: config.models.clone(),
    });

    let app = audix_ml::build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/server/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("audix-ml stopped");
    Ok(())
}

/// Console logging, plus an optional log file, filtered by `RUST_LOG` or the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(service_config::log_filter(logging)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
