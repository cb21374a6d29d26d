//! Event types for the Audix event system
//!
//! Provides the shared event definitions and the broadcast `EventBus` used for
//! analysis lifecycle updates and device alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Topic on which low-health device alerts are published
pub const ALERT_TOPIC: &str = "device_alerts";

/// Alert payload: a device whose health score fell to or below the alert threshold
///
/// Wire format keeps the field names consumers already subscribe to
/// (`deviceId`, `normalScore`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "normalScore")]
    pub health_score: f64,
}

/// Audix event types
///
/// Events are broadcast via `EventBus` and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AudixEvent {
    /// Pipeline run accepted a recording
    AnalysisStarted {
        run_id: Uuid,
        device_id: String,
        /// Component names handed to the separator
        requested_components: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Separation produced stems
    StemsSeparated {
        run_id: Uuid,
        device_id: String,
        /// Components the separator isolated
        produced: Vec<String>,
        /// Requested components the separator could not isolate
        missing: Vec<String>,
    },

    /// One component classified successfully
    ComponentClassified {
        run_id: Uuid,
        device_id: String,
        component: String,
        anomaly_probability: f64,
        anomaly_detected: bool,
    },

    /// One component could not be classified (isolated, run continues)
    ComponentFailed {
        run_id: Uuid,
        device_id: String,
        component: String,
        reason: String,
    },

    /// Pipeline run produced an outcome
    AnalysisCompleted {
        run_id: Uuid,
        device_id: String,
        health_score: f64,
        component_count: usize,
        anomaly_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline run ended in a terminal failure
    AnalysisFailed {
        run_id: Uuid,
        device_id: String,
        /// Stage label ("separation", "aggregation")
        stage: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Device health fell to or below the alert threshold
    DeviceAlert {
        topic: String,
        alert: AlertEvent,
        timestamp: DateTime<Utc>,
    },
}

impl AudixEvent {
    /// Event type name, used as the SSE event field
    pub fn event_type(&self) -> &str {
        match self {
            AudixEvent::AnalysisStarted { .. } => "AnalysisStarted",
            AudixEvent::StemsSeparated { .. } => "StemsSeparated",
            AudixEvent::ComponentClassified { .. } => "ComponentClassified",
            AudixEvent::ComponentFailed { .. } => "ComponentFailed",
            AudixEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            AudixEvent::AnalysisFailed { .. } => "AnalysisFailed",
            AudixEvent::DeviceAlert { .. } => "DeviceAlert",
        }
    }
}

/// Broadcast event bus shared by the pipeline, the alert publisher and SSE clients
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AudixEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers start lagging
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AudixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: AudixEvent) -> Result<usize, broadcast::error::SendError<AudixEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AudixEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
