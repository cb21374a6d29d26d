//! Core Types and Collaborator Trait Definitions for audix-ml
//!
//! The pipeline depends on four capability seams:
//! - **StemSeparator**: mixed recording → one isolated stem per component
//! - **ComponentClassifier**: one stem → anomaly probability + decision
//! - **ScoreStore**: upsert of the latest device health score
//! - **AlertPublisher**: fire-and-forget publish of low-health alerts
//!
//! Production implementations live in `services` and `db`; tests provide
//! deterministic stand-ins.

use crate::models::{DeviceId, Waveform};
use audix_common::events::AlertEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Components
// ============================================================================

/// Machine component that can be isolated and assessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Fan,
    Pump,
    Slider,
    Gearbox,
    Bearing,
}

impl Component {
    /// Canonical component set, in canonical order
    pub const ALL: [Component; 5] = [
        Component::Fan,
        Component::Pump,
        Component::Slider,
        Component::Gearbox,
        Component::Bearing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Fan => "fan",
            Component::Pump => "pump",
            Component::Slider => "slider",
            Component::Gearbox => "gearbox",
            Component::Bearing => "bearing",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Component::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| SelectionError::UnknownComponent(s.trim().to_string()))
    }
}

/// Non-empty, duplicate-free, ordered set of requested components
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComponentSelection(Vec<Component>);

impl ComponentSelection {
    /// The full canonical set
    pub fn all() -> Self {
        Self(Component::ALL.to_vec())
    }

    /// Build a selection from explicit components
    ///
    /// Duplicates are dropped (first occurrence wins); an empty list is rejected.
    pub fn new(components: impl IntoIterator<Item = Component>) -> Result<Self, SelectionError> {
        let mut selected: Vec<Component> = Vec::new();
        for component in components {
            if !selected.contains(&component) {
                selected.push(component);
            }
        }
        if selected.is_empty() {
            return Err(SelectionError::Empty);
        }
        Ok(Self(selected))
    }

    /// Parse a comma-separated list such as `"fan, pump,slider"`
    ///
    /// Blank entries are ignored. Unknown names are rejected.
    pub fn parse_list(list: &str) -> Result<Self, SelectionError> {
        let components = list
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Component::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(components)
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Invalid component selection at the public boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Unknown component: '{0}' (expected one of fan, pump, slider, gearbox, bearing)")]
    UnknownComponent(String),

    #[error("Component selection is empty")]
    Empty,
}

// ============================================================================
// Artifacts and classifications
// ============================================================================

/// Isolated audio for one component
///
/// Owned by the run that produced it and dropped once classified.
#[derive(Debug, Clone)]
pub struct ComponentArtifact {
    pub component: Component,
    pub waveform: Waveform,
}

/// Separator output, keyed by component
pub type StemMap = HashMap<Component, ComponentArtifact>;

/// Classifier verdict for one artifact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Anomaly probability (0.0-1.0)
    pub probability: f64,
    /// Classifier's own thresholded decision
    pub detected: bool,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Source separation backend
///
/// Returns one artifact per component it could isolate. Components it could not
/// isolate are simply absent from the map; an `Err` means nothing usable was produced.
#[async_trait::async_trait]
pub trait StemSeparator: Send + Sync {
    /// Separator name for logging and health reporting
    fn name(&self) -> &'static str;

    async fn separate(
        &self,
        waveform: &Waveform,
        components: &[Component],
    ) -> Result<StemMap, SeparationError>;
}

/// Per-component anomaly classification backend
#[async_trait::async_trait]
pub trait ComponentClassifier: Send + Sync {
    /// Classifier name for logging and health reporting
    fn name(&self) -> &'static str;

    /// Classify one isolated stem
    ///
    /// # Errors
    /// Failure is per call; the pipeline isolates it to this component.
    async fn classify(&self, artifact: &ComponentArtifact) -> Result<Classification, ClassificationError>;
}

/// Latest-value health score store keyed by device
#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    /// Overwrite the device's health score
    async fn upsert(&self, device_id: &DeviceId, health_score: f64) -> Result<(), StoreError>;
}

/// Publish side of the alert channel
#[async_trait::async_trait]
pub trait AlertPublisher: Send + Sync {
    /// Publish an alert on `topic`
    ///
    /// Returns whether the message left this process; says nothing about delivery.
    async fn publish(&self, topic: &str, alert: &AlertEvent) -> bool;
}

// ============================================================================
// Collaborator errors
// ============================================================================

/// Separator call failure
#[derive(Debug, Error)]
pub enum SeparationError {
    #[error("Separator request failed: {0}")]
    Request(String),

    #[error("Separator returned invalid output: {0}")]
    InvalidOutput(String),
}

/// Classifier call failure
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Classifier returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("No model available for component '{0}'")]
    ModelUnavailable(Component),
}

/// Score store write failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Score store unavailable: {0}")]
    Unavailable(String),
}
