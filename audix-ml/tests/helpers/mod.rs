//! Shared test helpers
//!
//! Deterministic collaborator stand-ins and WAV fixtures.

#![allow(dead_code)]

pub mod audio_generator;
pub mod stubs;

use audix_ml::models::{DeviceId, Recording, Waveform};
use audix_ml::workflow::{Pipeline, PostProcessor};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use stubs::{RecordingPublisher, RecordingStore, ScriptedClassifier, StubSeparator};

/// Sample rate used by all fixtures
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// One-second constant-level recording with a pinned receive time
pub fn recording(device: &str) -> Recording {
    Recording::new(
        DeviceId::new(device),
        Waveform::new(vec![0.25; TEST_SAMPLE_RATE as usize], TEST_SAMPLE_RATE),
    )
    .received_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

/// Pipeline plus handles on its recording collaborators
pub struct Harness {
    pub pipeline: Pipeline,
    pub separator: Arc<StubSeparator>,
    pub classifier: Arc<ScriptedClassifier>,
    pub store: Arc<RecordingStore>,
    pub publisher: Arc<RecordingPublisher>,
}

impl Harness {
    pub fn new(separator: StubSeparator, classifier: ScriptedClassifier) -> Self {
        Self::with_side_effects(separator, classifier, RecordingStore::new(), RecordingPublisher::new())
    }

    pub fn with_side_effects(
        separator: StubSeparator,
        classifier: ScriptedClassifier,
        store: RecordingStore,
        publisher: RecordingPublisher,
    ) -> Self {
        let separator = Arc::new(separator);
        let classifier = Arc::new(classifier);
        let store = Arc::new(store);
        let publisher = Arc::new(publisher);

        let pipeline = Pipeline::new(
            separator.clone(),
            classifier.clone(),
            PostProcessor::new(store.clone(), publisher.clone()),
        );

        Self {
            pipeline,
            separator,
            classifier,
            store,
            publisher,
        }
    }
}
