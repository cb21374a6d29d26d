//! Recording and device identity
//!
//! A `Recording` is the decoded mono waveform the pipeline consumes. It is built at
//! the ingestion boundary and never mutated afterwards; raw audio is not persisted.

use crate::types::ComponentSelection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Device identity as used for score storage and alerts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the device's health record is stored
    pub fn store_key(&self) -> String {
        format!("device:{}", self.0)
    }

    /// Identity for the `index`-th (0-based) file of a batch submitted for this device
    pub fn batch_item(&self, index: usize) -> Self {
        Self(format!("{}_file_{}", self.0, index + 1))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Mono PCM samples at a fixed sample rate
///
/// Samples are shared, so cloning a waveform does not copy audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A decoded recording accepted for analysis
#[derive(Debug, Clone)]
pub struct Recording {
    pub device_id: DeviceId,
    pub waveform: Waveform,
    /// Explicit component request; `None` means the full canonical set
    pub requested: Option<ComponentSelection>,
    /// When the recording entered the system
    pub received_at: DateTime<Utc>,
}

impl Recording {
    pub fn new(device_id: DeviceId, waveform: Waveform) -> Self {
        Self {
            device_id,
            waveform,
            requested: None,
            received_at: Utc::now(),
        }
    }

    /// Restrict analysis to an explicit component selection
    pub fn with_components(mut self, selection: ComponentSelection) -> Self {
        self.requested = Some(selection);
        self
    }

    /// Pin the receive timestamp (replays and tests)
    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }

    /// Components this recording should be analyzed for
    pub fn components(&self) -> ComponentSelection {
        self.requested.clone().unwrap_or_else(ComponentSelection::all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Component;

    #[test]
    fn test_store_key_and_batch_identity() {
        let device = DeviceId::from(42);
        assert_eq!(device.store_key(), "device:42");
        assert_eq!(device.batch_item(0).as_str(), "42_file_1");
        assert_eq!(device.batch_item(9).store_key(), "device:42_file_10");
    }

    #[test]
    fn test_default_components_are_canonical_set() {
        let recording = Recording::new(DeviceId::new("7"), Waveform::new(vec![0.0; 8], 8));
        assert_eq!(recording.components(), ComponentSelection::all());

        let narrowed = recording
            .with_components(ComponentSelection::new([Component::Bearing]).unwrap());
        assert_eq!(narrowed.components().as_slice(), &[Component::Bearing]);
    }

    #[test]
    fn test_waveform_duration() {
        let waveform = Waveform::new(vec![0.0; 22050], 44100);
        assert!((waveform.duration_seconds() - 0.5).abs() < 1e-9);
        assert_eq!(Waveform::new(Vec::new(), 0).duration_seconds(), 0.0);
    }
}
