//! Alert publication over the in-process event bus
//!
//! SSE clients subscribed to `/events` receive every `DeviceAlert`. A send with no
//! subscribers still counts as sent: delivery is the subscriber's concern.

use crate::types::AlertPublisher;
use audix_common::events::{AlertEvent, AudixEvent, EventBus};
use tracing::debug;

pub struct EventBusAlertPublisher {
    event_bus: EventBus,
}

impl EventBusAlertPublisher {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait::async_trait]
impl AlertPublisher for EventBusAlertPublisher {
    async fn publish(&self, topic: &str, alert: &AlertEvent) -> bool {
        let event = AudixEvent::DeviceAlert {
            topic: topic.to_string(),
            alert: alert.clone(),
            timestamp: chrono::Utc::now(),
        };
        match self.event_bus.emit(event) {
            Ok(receivers) => debug!(topic, receivers, "Alert sent"),
            Err(_) => debug!(topic, "Alert sent with no active subscribers"),
        }
        true
    }
}
