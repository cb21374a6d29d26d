//! Post-processing of a computed outcome
//!
//! Score persistence and alert publication run after aggregation and report their
//! own status. Neither can turn a successful outcome into a failure.

use super::alert_gate::{should_alert, ALERT_THRESHOLD};
use crate::models::{AnalysisOutcome, PostProcessReport, SideEffectStatus};
use crate::types::{AlertPublisher, ScoreStore};
use audix_common::events::{AlertEvent, ALERT_TOPIC};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies best-effort side effects for a successful outcome
#[derive(Clone)]
pub struct PostProcessor {
    store: Arc<dyn ScoreStore>,
    publisher: Arc<dyn AlertPublisher>,
}

impl PostProcessor {
    pub fn new(store: Arc<dyn ScoreStore>, publisher: Arc<dyn AlertPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Upsert the score, then publish an alert if the gate triggers
    ///
    /// Each call is attempted at most once and never retried.
    pub async fn apply(&self, outcome: &AnalysisOutcome) -> PostProcessReport {
        let score_store = match self.store.upsert(&outcome.device_id, outcome.health_score).await {
            Ok(()) => {
                debug!(
                    device_id = %outcome.device_id,
                    health_score = outcome.health_score,
                    "Health score stored"
                );
                SideEffectStatus::Applied
            }
            Err(e) => {
                warn!(device_id = %outcome.device_id, "Failed to store health score: {}", e);
                SideEffectStatus::Failed { reason: e.to_string() }
            }
        };

        let alert = if should_alert(outcome.health_score, ALERT_THRESHOLD) {
            let payload = AlertEvent {
                device_id: outcome.device_id.to_string(),
                health_score: outcome.health_score,
            };
            if self.publisher.publish(ALERT_TOPIC, &payload).await {
                info!(
                    device_id = %outcome.device_id,
                    health_score = outcome.health_score,
                    "Device alert published"
                );
                SideEffectStatus::Applied
            } else {
                warn!(device_id = %outcome.device_id, "Device alert could not be sent");
                SideEffectStatus::Failed {
                    reason: format!("publish to '{}' failed", ALERT_TOPIC),
                }
            }
        } else {
            SideEffectStatus::Skipped
        };

        PostProcessReport { score_store, alert }
    }
}
