//! Production collaborators
//!
//! - `remote_models`: HTTP clients for the separation and classification models
//! - `alert_publisher`: alert channel backed by the event bus

pub mod alert_publisher;
pub mod remote_models;

pub use alert_publisher::EventBusAlertPublisher;
pub use remote_models::{ClientBuildError, RemoteClassifier, RemoteSeparator};
