//! Analysis endpoints
//!
//! Uploads arrive as multipart forms, are validated and decoded at this boundary,
//! and only then handed to the pipeline.

use crate::db::DeviceHealthRecord;
use crate::models::{AnalysisOutcome, ComponentFailure, ComponentResult, DeviceId, PostProcessReport};
use crate::types::{Component, ComponentSelection};
use crate::workflow::{AudioUpload, BatchItem, BatchItemResult, ItemFailure};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PartsResponse {
    pub parts: Vec<Component>,
    pub count: usize,
}

/// Device-level results as reported to clients
#[derive(Debug, Serialize)]
pub struct AnalysisResults {
    pub device_id: DeviceId,
    pub results: Vec<ComponentResult>,
    pub total_parts: usize,
    pub anomaly_count: usize,
    #[serde(rename = "normalScore")]
    pub health_score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_parts: Vec<ComponentFailure>,
    pub timestamp: DateTime<Utc>,
}

impl From<AnalysisOutcome> for AnalysisResults {
    fn from(outcome: AnalysisOutcome) -> Self {
        Self {
            device_id: outcome.device_id,
            total_parts: outcome.component_count,
            anomaly_count: outcome.anomaly_count,
            health_score: outcome.health_score,
            results: outcome.component_results,
            failed_parts: outcome.component_failures,
            timestamp: outcome.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineInfo {
    pub original_filename: String,
    pub target_parts: Vec<Component>,
    pub analyzed_parts: Vec<Component>,
    pub sample_rate: u32,
    pub duration_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub pipeline_info: PipelineInfo,
    pub analysis_results: AnalysisResults,
    pub side_effects: PostProcessReport,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchEntry {
    Success {
        index: usize,
        filename: String,
        analysis_results: AnalysisResults,
        side_effects: PostProcessReport,
    },
    Error {
        index: usize,
        filename: String,
        device_id: DeviceId,
        stage: &'static str,
        error_message: String,
    },
}

impl From<BatchItemResult> for BatchEntry {
    fn from(item: BatchItemResult) -> Self {
        match item.result {
            Ok(report) => BatchEntry::Success {
                index: item.index,
                filename: item.filename,
                analysis_results: report.outcome.into(),
                side_effects: report.side_effects,
            },
            Err(failure) => BatchEntry::Error {
                index: item.index,
                filename: item.filename,
                device_id: item.device_id,
                stage: failure.stage(),
                error_message: failure.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub device_id: String,
    #[serde(rename = "normalScore")]
    pub health_score: f64,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Multipart parsing
// ============================================================================

/// Fields shared by the single and batch forms
#[derive(Default)]
struct AnalysisForm {
    uploads: Vec<AudioUpload>,
    target_parts: Option<String>,
    device_id: Option<String>,
}

impl AnalysisForm {
    async fn read(mut multipart: Multipart, file_field: &str) -> ApiResult<Self> {
        let mut form = AnalysisForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                form.uploads.push(AudioUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            } else if name == "target_parts" || name == "device_id" {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field '{}': {}", name, e)))?;
                if name == "target_parts" {
                    form.target_parts = Some(value);
                } else {
                    form.device_id = Some(value);
                }
            }
        }

        Ok(form)
    }

    fn device_id(&self) -> ApiResult<DeviceId> {
        let raw = self
            .device_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing field 'device_id'".to_string()))?;
        raw.parse::<i64>()
            .map(DeviceId::from)
            .map_err(|_| ApiError::BadRequest(format!("device_id must be an integer (got '{}')", raw)))
    }

    /// Explicit selection, or `None` for the full set when the field is absent/blank
    fn selection(&self) -> ApiResult<Option<ComponentSelection>> {
        match self.target_parts.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(list) => Ok(Some(ComponentSelection::parse_list(list)?)),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /developer/parts
pub async fn list_parts() -> Json<PartsResponse> {
    Json(PartsResponse {
        parts: Component::ALL.to_vec(),
        count: Component::ALL.len(),
    })
}

/// POST /developer/device/analyze
///
/// Multipart fields: `file` (WAV), `device_id` (integer), optional `target_parts`
/// (comma-separated component names).
pub async fn analyze_device(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let form = AnalysisForm::read(multipart, "file").await?;
    let device_id = form.device_id()?;
    let selection = form.selection()?;
    let upload = form
        .uploads
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("Missing field 'file'".to_string()))?;

    info!(%device_id, filename = %upload.filename, "Analysis requested");

    let original_filename = upload.filename.clone();
    let recording = state.ingestor.ingest(upload, device_id, selection).await?;

    let report = match state.pipeline.run(&recording).await {
        Ok(report) => report,
        Err(failure) => {
            *state.last_error.write().await = Some(failure.to_string());
            return Err(failure.into());
        }
    };

    let pipeline_info = PipelineInfo {
        original_filename,
        target_parts: recording.components().as_slice().to_vec(),
        analyzed_parts: report
            .outcome
            .component_results
            .iter()
            .map(|r| r.component)
            .collect(),
        sample_rate: recording.waveform.sample_rate(),
        duration_seconds: recording.waveform.duration_seconds(),
    };

    Ok(Json(AnalyzeResponse {
        status: "success",
        pipeline_info,
        analysis_results: report.outcome.into(),
        side_effects: report.side_effects,
    }))
}

/// POST /developer/batch/analyze
///
/// Multipart fields: `files` (one or more WAVs), `device_id`, optional `target_parts`.
/// File *i* (0-based) is analyzed as device `{device_id}_file_{i+1}`.
pub async fn analyze_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<BatchResponse>> {
    let form = AnalysisForm::read(multipart, "files").await?;
    let device_id = form.device_id()?;
    let selection = form.selection()?;

    if form.uploads.is_empty() {
        return Err(ApiError::BadRequest("Missing field 'files'".to_string()));
    }

    let items: Vec<BatchItem> = form
        .uploads
        .into_iter()
        .enumerate()
        .map(|(index, upload)| BatchItem {
            upload,
            device_id: device_id.batch_item(index),
            requested: selection.clone(),
        })
        .collect();

    let results = state.batch.run_batch(items).await?;

    let total_files = results.len();
    let successful = results.iter().filter(|r| r.is_success()).count();
    if successful < total_files {
        warn!(%device_id, failed = total_files - successful, "Batch finished with failures");
    }

    let last_failure = results.iter().rev().find_map(|item| match &item.result {
        Err(ItemFailure::Pipeline(failure)) => Some(failure.to_string()),
        _ => None,
    });
    if let Some(failure) = last_failure {
        *state.last_error.write().await = Some(failure);
    }

    Ok(Json(BatchResponse {
        status: "completed",
        total_files,
        successful,
        failed: total_files - successful,
        results: results.into_iter().map(BatchEntry::from).collect(),
    }))
}

/// GET /developer/device/:device_id/score
pub async fn device_score(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<ScoreResponse>> {
    let device_id = DeviceId::new(device_id);
    let record: DeviceHealthRecord = state
        .scores
        .get(&device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No health score for device {}", device_id)))?;

    Ok(Json(ScoreResponse {
        device_id: device_id.to_string(),
        health_score: record.health_score,
        updated_at: record.updated_at,
    }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/developer/parts", get(list_parts))
        .route("/developer/device/analyze", post(analyze_device))
        .route("/developer/batch/analyze", post(analyze_batch))
        .route("/developer/device/:device_id/score", get(device_score))
}
