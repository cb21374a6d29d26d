//! Pipeline Orchestrator
//!
//! Drives one recording through the analysis stages:
//! - **Step 1**: Separation (one separator call for the full requested set)
//! - **Step 2**: Classification (one independent classifier call per artifact)
//! - **Step 3**: Aggregation (device health score)
//! - **Step 4**: Post-processing (score upsert, alert gate)
//!
//! # Error Handling
//! - Per-component isolation: a failed classification drops only that component
//! - Separation that yields nothing and aggregation over nothing are terminal
//! - Side-effect failures are reported next to the outcome, never instead of it
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(separator, classifier, post_processor).with_events(bus);
//! let report = pipeline.run(&recording).await?;
//! ```

use super::aggregation;
use super::post_process::PostProcessor;
use crate::models::{
    AnalysisOutcome, ComponentFailure, ComponentFailureKind, ComponentResult, PipelineFailure,
    Recording, RunReport,
};
use crate::types::{
    Classification, ClassificationError, Component, ComponentArtifact, ComponentClassifier,
    ComponentSelection, StemSeparator,
};
use audix_common::events::{AudixEvent, EventBus};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline orchestrator
pub struct Pipeline {
    separator: Arc<dyn StemSeparator>,
    classifier: Arc<dyn ComponentClassifier>,
    post_processor: PostProcessor,
    event_bus: Option<EventBus>,
}

impl Pipeline {
    pub fn new(
        separator: Arc<dyn StemSeparator>,
        classifier: Arc<dyn ComponentClassifier>,
        post_processor: PostProcessor,
    ) -> Self {
        Self {
            separator,
            classifier,
            post_processor,
            event_bus: None,
        }
    }

    /// Broadcast progress events for every run
    pub fn with_events(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn separator_name(&self) -> &'static str {
        self.separator.name()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Run all four steps for one recording
    ///
    /// # Returns
    /// * `Ok(RunReport)` - outcome plus independent side-effect status
    /// * `Err(PipelineFailure)` - tagged separation/aggregation failure; nothing was stored or published
    pub async fn run(&self, recording: &Recording) -> Result<RunReport, PipelineFailure> {
        let outcome = self.analyze(recording).await?;
        let side_effects = self.post_processor.apply(&outcome).await;
        Ok(RunReport {
            outcome,
            side_effects,
        })
    }

    /// Separation, classification and aggregation only (no side effects)
    ///
    /// Deterministic for deterministic collaborators: the outcome timestamp is the
    /// recording's receive time.
    pub async fn analyze(&self, recording: &Recording) -> Result<AnalysisOutcome, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let requested = recording.components();

        info!(
            %run_id,
            device_id = %recording.device_id,
            components = requested.len(),
            "Pipeline run started"
        );
        self.emit(AudixEvent::AnalysisStarted {
            run_id,
            device_id: recording.device_id.to_string(),
            requested_components: names(requested.iter().copied()),
            timestamp: chrono::Utc::now(),
        });

        let result = self.evaluate(run_id, recording, &requested).await;

        match &result {
            Ok(outcome) => {
                info!(
                    %run_id,
                    device_id = %outcome.device_id,
                    health_score = outcome.health_score,
                    components = outcome.component_count,
                    anomalies = outcome.anomaly_count,
                    "Pipeline run completed"
                );
                self.emit(AudixEvent::AnalysisCompleted {
                    run_id,
                    device_id: outcome.device_id.to_string(),
                    health_score: outcome.health_score,
                    component_count: outcome.component_count,
                    anomaly_count: outcome.anomaly_count,
                    timestamp: outcome.timestamp,
                });
            }
            Err(failure) => {
                error!(%run_id, "Pipeline run failed: {}", failure);
                self.emit(AudixEvent::AnalysisFailed {
                    run_id,
                    device_id: failure.device_id.to_string(),
                    stage: failure.stage.to_string(),
                    reason: failure.reason.clone(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        result
    }

    async fn evaluate(
        &self,
        run_id: Uuid,
        recording: &Recording,
        requested: &ComponentSelection,
    ) -> Result<AnalysisOutcome, PipelineFailure> {
        // Step 1: Separation
        let (artifacts, mut failures) = self.separate(run_id, recording, requested).await?;

        // Step 2: Classification
        let mut results = Vec::with_capacity(artifacts.len());
        for (component, verdict) in self.classify_all(artifacts).await {
            match verdict {
                Ok(classification) => {
                    debug!(
                        %run_id,
                        %component,
                        probability = classification.probability,
                        detected = classification.detected,
                        "Component classified"
                    );
                    self.emit(AudixEvent::ComponentClassified {
                        run_id,
                        device_id: recording.device_id.to_string(),
                        component: component.to_string(),
                        anomaly_probability: classification.probability,
                        anomaly_detected: classification.detected,
                    });
                    results.push(ComponentResult {
                        component,
                        anomaly_probability: classification.probability,
                        anomaly_detected: classification.detected,
                    });
                }
                Err(e) => {
                    warn!(%run_id, %component, "Classification failed: {}", e);
                    self.emit(AudixEvent::ComponentFailed {
                        run_id,
                        device_id: recording.device_id.to_string(),
                        component: component.to_string(),
                        reason: e.to_string(),
                    });
                    failures.push(ComponentFailure {
                        component,
                        kind: ComponentFailureKind::Classification,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Step 3: Aggregation
        aggregation::aggregate(
            recording.device_id.clone(),
            results,
            failures,
            recording.received_at,
        )
    }

    /// Invoke the separator once and order its artifacts by request
    ///
    /// Keys that were not requested are dropped. Requested components without an
    /// artifact are reported as `NotSeparated`.
    async fn separate(
        &self,
        run_id: Uuid,
        recording: &Recording,
        requested: &ComponentSelection,
    ) -> Result<(Vec<ComponentArtifact>, Vec<ComponentFailure>), PipelineFailure> {
        let mut stems = match self
            .separator
            .separate(&recording.waveform, requested.as_slice())
            .await
        {
            Ok(stems) => stems,
            Err(e) => {
                return Err(PipelineFailure::separation(
                    recording.device_id.clone(),
                    e.to_string(),
                ));
            }
        };

        let mut artifacts = Vec::with_capacity(requested.len());
        let mut failures = Vec::new();
        for &component in requested.iter() {
            match stems.remove(&component) {
                Some(artifact) => artifacts.push(artifact),
                None => failures.push(ComponentFailure {
                    component,
                    kind: ComponentFailureKind::NotSeparated,
                    reason: format!("{} produced no stem", self.separator.name()),
                }),
            }
        }

        if !stems.is_empty() {
            let mut extra: Vec<Component> = stems.into_keys().collect();
            extra.sort();
            warn!(%run_id, ?extra, "Separator returned unrequested components, ignoring");
        }

        self.emit(AudixEvent::StemsSeparated {
            run_id,
            device_id: recording.device_id.to_string(),
            produced: names(artifacts.iter().map(|a| a.component)),
            missing: names(failures.iter().map(|f| f.component)),
        });

        if artifacts.is_empty() {
            return Err(PipelineFailure::separation(
                recording.device_id.clone(),
                "separator produced no usable artifacts",
            ));
        }

        debug!(
            %run_id,
            produced = artifacts.len(),
            missing = failures.len(),
            "Separation complete"
        );
        Ok((artifacts, failures))
    }

    /// Classify every artifact concurrently; results keep artifact order
    ///
    /// Artifacts are consumed here and dropped once their classification returns.
    async fn classify_all(
        &self,
        artifacts: Vec<ComponentArtifact>,
    ) -> Vec<(Component, Result<Classification, ClassificationError>)> {
        let futures = artifacts.into_iter().map(|artifact| {
            let classifier = Arc::clone(&self.classifier);
            async move {
                let verdict = classifier
                    .classify(&artifact)
                    .await
                    .and_then(validate_classification);
                (artifact.component, verdict)
            }
        });
        join_all(futures).await
    }

    fn emit(&self, event: AudixEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}

/// Reject probabilities outside [0, 1] (including NaN)
fn validate_classification(
    classification: Classification,
) -> Result<Classification, ClassificationError> {
    if (0.0..=1.0).contains(&classification.probability) {
        Ok(classification)
    } else {
        Err(ClassificationError::InvalidOutput(format!(
            "anomaly probability {} outside [0, 1]",
            classification.probability
        )))
    }
}

fn names(components: impl Iterator<Item = Component>) -> Vec<String> {
    components.map(|c| c.to_string()).collect()
}
