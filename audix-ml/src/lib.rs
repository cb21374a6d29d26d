//! audix-ml library interface
//!
//! Exposes the analysis pipeline, its collaborators and the HTTP router for the
//! binary and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use audix_common::config::ModelsConfig;
use audix_common::events::EventBus;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use db::SqliteScoreStore;
use services::EventBusAlertPublisher;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use types::{ComponentClassifier, StemSeparator};
use workflow::{BatchCoordinator, Ingestor, Pipeline, PostProcessor};

/// Upload size limit (a full batch of 10 s WAVs fits comfortably)
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Collaborators and settings needed to assemble the service
pub struct ServiceParts {
    pub separator: Arc<dyn StemSeparator>,
    pub classifier: Arc<dyn ComponentClassifier>,
    pub scores: SqliteScoreStore,
    pub event_bus: EventBus,
    pub ingestor: Ingestor,
    pub batch_concurrency: usize,
    /// Reported by the health endpoint
    pub models: ModelsConfig,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub batch: Arc<BatchCoordinator>,
    pub ingestor: Ingestor,
    pub scores: SqliteScoreStore,
    /// Event bus for SSE broadcasting and alert publication
    pub event_bus: EventBus,
    pub models: ModelsConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Wire the pipeline, post-processing and batch coordinator from their parts
    pub fn new(parts: ServiceParts) -> Self {
        let publisher = Arc::new(EventBusAlertPublisher::new(parts.event_bus.clone()));
        let post_processor = PostProcessor::new(Arc::new(parts.scores.clone()), publisher);

        let pipeline = Arc::new(
            Pipeline::new(parts.separator, parts.classifier, post_processor)
                .with_events(parts.event_bus.clone()),
        );
        let batch = Arc::new(BatchCoordinator::new(
            Arc::clone(&pipeline),
            parts.ingestor.clone(),
            parts.batch_concurrency,
        ));

        Self {
            pipeline,
            batch,
            ingestor: parts.ingestor,
            scores: parts.scores,
            event_bus: parts.event_bus,
            models: parts.models,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::analysis_routes())
        .merge(api::event_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
