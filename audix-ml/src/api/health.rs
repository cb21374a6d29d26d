//! Health check and service info endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    /// Module name ("audix-ml")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub separator: CollaboratorInfo,
    pub classifier: CollaboratorInfo,
    /// "ok" or "unreachable"
    pub score_store: String,
    /// Active SSE subscribers
    pub event_subscribers: usize,
    /// Last pipeline failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollaboratorInfo {
    pub name: String,
    pub url: String,
}

/// GET /server/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let store_ok = state.scores.is_reachable().await;
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if store_ok { "ok" } else { "degraded" }.to_string(),
        module: "audix-ml".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        separator: CollaboratorInfo {
            name: state.pipeline.separator_name().to_string(),
            url: state.models.separator_url.clone(),
        },
        classifier: CollaboratorInfo {
            name: state.pipeline.classifier_name().to_string(),
            url: state.models.classifier_url.clone(),
        },
        score_store: if store_ok { "ok" } else { "unreachable" }.to_string(),
        event_subscribers: state.event_bus.subscriber_count(),
        last_error,
    })
}

/// Service info response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    pub routes: Vec<RouteInfo>,
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/", "Service info"),
    ("GET", "/server/info", "Service info"),
    ("GET", "/server/health", "Health check"),
    ("GET", "/developer/parts", "Analyzable components"),
    ("POST", "/developer/device/analyze", "Analyze one WAV recording"),
    ("POST", "/developer/batch/analyze", "Analyze up to 10 WAV recordings"),
    ("GET", "/developer/device/:device_id/score", "Latest stored health score"),
    ("GET", "/events", "SSE stream of analysis events and alerts"),
    ("GET", "/events/alerts", "SSE stream of device alerts"),
];

/// GET / and GET /server/info
pub async fn server_info() -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "audix-ml".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        routes: ROUTES
            .iter()
            .map(|&(method, path, description)| RouteInfo {
                method,
                path,
                description,
            })
            .collect(),
    })
}

/// Build health and info routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(server_info))
        .route("/server/info", get(server_info))
        .route("/server/health", get(health_check))
}
