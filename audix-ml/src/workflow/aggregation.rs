//! Device-level aggregation of component results

use crate::models::{AnalysisOutcome, ComponentFailure, ComponentResult, DeviceId, PipelineFailure};
use chrono::{DateTime, Utc};

/// Health score: `1 - mean(anomaly_probability)`, clamped to [0, 1]
///
/// Returns `None` when there is nothing to average.
pub fn health_score(results: &[ComponentResult]) -> Option<f64> {
    if results.is_empty() {
        return None;
    }
    let mean = results.iter().map(|r| r.anomaly_probability).sum::<f64>() / results.len() as f64;
    Some((1.0 - mean).clamp(0.0, 1.0))
}

pub fn anomaly_count(results: &[ComponentResult]) -> usize {
    results.iter().filter(|r| r.anomaly_detected).count()
}

/// Assemble the outcome for a device, or fail if no component was classified
pub fn aggregate(
    device_id: DeviceId,
    component_results: Vec<ComponentResult>,
    component_failures: Vec<ComponentFailure>,
    timestamp: DateTime<Utc>,
) -> Result<AnalysisOutcome, PipelineFailure> {
    let Some(health_score) = health_score(&component_results) else {
        return Err(PipelineFailure::aggregation(device_id, component_failures));
    };

    Ok(AnalysisOutcome {
        device_id,
        health_score,
        component_count: component_results.len(),
        anomaly_count: anomaly_count(&component_results),
        component_results,
        component_failures,
        timestamp,
    })
}
