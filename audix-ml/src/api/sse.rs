//! Server-Sent Events (SSE) for analysis progress and device alerts

use crate::AppState;
use audix_common::events::AudixEvent;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// GET /events - every event on the bus
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to analysis events");
    subscribe(state, |_| true)
}

/// GET /events/alerts - device alerts only
pub async fn alert_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to device alerts");
    subscribe(state, |event| matches!(event, AudixEvent::DeviceAlert { .. }))
}

fn subscribe(
    state: AppState,
    filter: fn(&AudixEvent) -> bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if filter(&event) => {
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!("SSE: Broadcasting event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => warn!("SSE: Failed to serialize event {}: {}", event_type, e),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: Client lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}

/// Build SSE routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(event_stream))
        .route("/events/alerts", get(alert_stream))
}
