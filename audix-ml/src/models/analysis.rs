//! Analysis results, terminal failures and side-effect status

use super::DeviceId;
use crate::types::Component;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of one isolated component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResult {
    pub component: Component,
    /// Anomaly probability (0.0-1.0)
    pub anomaly_probability: f64,
    /// Decision as reported by the classifier (never recomputed here)
    pub anomaly_detected: bool,
}

/// A component that was requested but produced no result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentFailure {
    pub component: Component,
    pub kind: ComponentFailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentFailureKind {
    /// Separator did not isolate this component
    NotSeparated,
    /// Classifier call failed or returned an unusable probability
    Classification,
}

/// Device-level result of one successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub device_id: DeviceId,
    /// Successfully classified components, in request order
    pub component_results: Vec<ComponentResult>,
    /// `1 - mean(anomaly_probability)` over `component_results`
    pub health_score: f64,
    pub component_count: usize,
    pub anomaly_count: usize,
    /// Requested components that did not contribute to the score
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub component_failures: Vec<ComponentFailure>,
    pub timestamp: DateTime<Utc>,
}

/// Stage at which a run failed as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Separation,
    Aggregation,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Separation => "separation",
            PipelineStage::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{stage} failed for device {device_id}: {reason}")]
pub struct PipelineFailure {
    pub device_id: DeviceId,
    pub stage: PipelineStage,
    pub reason: String,
    /// Per-component failures observed before the run ended
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub component_failures: Vec<ComponentFailure>,
}

impl PipelineFailure {
    pub fn separation(device_id: DeviceId, reason: impl Into<String>) -> Self {
        Self {
            device_id,
            stage: PipelineStage::Separation,
            reason: reason.into(),
            component_failures: Vec::new(),
        }
    }

    pub fn aggregation(device_id: DeviceId, component_failures: Vec<ComponentFailure>) -> Self {
        Self {
            device_id,
            stage: PipelineStage::Aggregation,
            reason: "no classifiable components".to_string(),
            component_failures,
        }
    }
}

/// Result of one best-effort side call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideEffectStatus {
    Applied,
    /// Gate decided no call was needed
    Skipped,
    Failed { reason: String },
}

impl SideEffectStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SideEffectStatus::Failed { .. })
    }
}

/// Status of the post-processing step, independent of the outcome itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProcessReport {
    pub score_store: SideEffectStatus,
    pub alert: SideEffectStatus,
}

/// Full result of a run: the outcome plus what happened to its side effects
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: AnalysisOutcome,
    pub side_effects: PostProcessReport,
}
