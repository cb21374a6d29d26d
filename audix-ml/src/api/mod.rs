//! HTTP API handlers for audix-ml

pub mod analysis;
pub mod health;
pub mod sse;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use sse::event_routes;
