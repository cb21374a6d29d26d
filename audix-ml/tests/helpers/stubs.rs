//! Deterministic collaborators for pipeline tests

use async_trait::async_trait;
use audix_common::events::AlertEvent;
use audix_ml::models::{DeviceId, Waveform};
use audix_ml::types::{
    AlertPublisher, Classification, ClassificationError, Component, ComponentArtifact,
    ComponentClassifier, ScoreStore, SeparationError, StemMap, StemSeparator, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Separator that copies the input into one stem per producible component
pub struct StubSeparator {
    /// Components it can isolate; `None` means every requested component
    producible: Option<HashSet<Component>>,
    /// Components returned even though nobody asked for them
    extra: Vec<Component>,
    /// Fail outright on all-zero input
    fail_on_silence: bool,
    /// Fail every call
    always_fail: bool,
    calls: AtomicUsize,
}

impl StubSeparator {
    pub fn all() -> Self {
        Self {
            producible: None,
            extra: Vec::new(),
            fail_on_silence: false,
            always_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn only(components: &[Component]) -> Self {
        Self {
            producible: Some(components.iter().copied().collect()),
            ..Self::all()
        }
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::all()
        }
    }

    pub fn with_extra(mut self, extra: &[Component]) -> Self {
        self.extra = extra.to_vec();
        self
    }

    pub fn failing_on_silence(mut self) -> Self {
        self.fail_on_silence = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StemSeparator for StubSeparator {
    fn name(&self) -> &'static str {
        "stub-separator"
    }

    async fn separate(
        &self,
        waveform: &Waveform,
        components: &[Component],
    ) -> Result<StemMap, SeparationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(SeparationError::Request("model server unreachable".to_string()));
        }
        if self.fail_on_silence && waveform.samples().iter().all(|s| *s == 0.0) {
            return Err(SeparationError::InvalidOutput("silent input".to_string()));
        }

        let mut stems = StemMap::new();
        for &component in components.iter().chain(self.extra.iter()) {
            let producible = self
                .producible
                .as_ref()
                .map(|set| set.contains(&component))
                .unwrap_or(true);
            if producible || self.extra.contains(&component) {
                stems.insert(
                    component,
                    ComponentArtifact {
                        component,
                        waveform: waveform.clone(),
                    },
                );
            }
        }
        Ok(stems)
    }
}

/// Scripted per-component classifier response
#[derive(Debug, Clone)]
pub enum Verdict {
    Score(f64, bool),
    Fail(&'static str),
}

/// Classifier answering from a fixed per-component script
pub struct ScriptedClassifier {
    script: HashMap<Component, Verdict>,
    default: Verdict,
    calls: Mutex<Vec<Component>>,
}

impl ScriptedClassifier {
    /// Same verdict for every component
    pub fn uniform(probability: f64, detected: bool) -> Self {
        Self {
            script: HashMap::new(),
            default: Verdict::Score(probability, detected),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: HashMap::new(),
            default: Verdict::Fail("inference error"),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, component: Component, verdict: Verdict) -> Self {
        self.script.insert(component, verdict);
        self
    }

    pub fn calls(&self) -> Vec<Component> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComponentClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted-classifier"
    }

    async fn classify(&self, artifact: &ComponentArtifact) -> Result<Classification, ClassificationError> {
        self.calls.lock().unwrap().push(artifact.component);
        match self.script.get(&artifact.component).unwrap_or(&self.default) {
            Verdict::Score(probability, detected) => Ok(Classification {
                probability: *probability,
                detected: *detected,
            }),
            Verdict::Fail(reason) => Err(ClassificationError::Request(reason.to_string())),
        }
    }
}

/// Score store that remembers every write
pub struct RecordingStore {
    writes: Mutex<Vec<(DeviceId, f64)>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn writes(&self) -> Vec<(DeviceId, f64)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreStore for RecordingStore {
    async fn upsert(&self, device_id: &DeviceId, health_score: f64) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        self.writes.lock().unwrap().push((device_id.clone(), health_score));
        Ok(())
    }
}

/// Alert publisher that remembers every publish
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, AlertEvent)>>,
    accept: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            accept: true,
        }
    }

    /// Publisher whose local send always fails
    pub fn rejecting() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            accept: false,
        }
    }

    pub fn published(&self) -> Vec<(String, AlertEvent)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, alert: &AlertEvent) -> bool {
        self.published.lock().unwrap().push((topic.to_string(), alert.clone()));
        self.accept
    }
}
