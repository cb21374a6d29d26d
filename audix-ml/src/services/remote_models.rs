//! HTTP clients for the model-serving processes
//!
//! The separation and classification models run out of process. These clients speak
//! a small JSON protocol:
//!
//! - `POST {separator_url}/separate`
//!   `{"sample_rate", "samples", "components"}` → `{"stems": {name: {"sample_rate", "samples"}}}`
//! - `POST {classifier_url}/classify/{component}`
//!   `{"sample_rate", "samples"}` → `{"anomaly_probability", "anomaly_detected"}`

use crate::models::Waveform;
use crate::types::{
    Classification, ClassificationError, Component, ComponentArtifact, ComponentClassifier,
    SeparationError, StemMap, StemSeparator,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("audix-ml/", env!("CARGO_PKG_VERSION"));

/// Client construction failure
#[derive(Debug, Error)]
#[error("Failed to build HTTP client: {0}")]
pub struct ClientBuildError(String);

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientBuildError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ClientBuildError(e.to_string()))
}

#[derive(Serialize)]
struct SeparateRequest<'a> {
    sample_rate: u32,
    samples: &'a [f32],
    components: &'a [Component],
}

#[derive(Deserialize)]
struct SeparateResponse {
    stems: HashMap<String, StemPayload>,
}

#[derive(Deserialize)]
struct StemPayload {
    sample_rate: u32,
    samples: Vec<f32>,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    sample_rate: u32,
    samples: &'a [f32],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    anomaly_probability: f64,
    anomaly_detected: bool,
}

/// Source separation over HTTP
pub struct RemoteSeparator {
    http_client: reqwest::Client,
    base_url: String,
}

impl RemoteSeparator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl StemSeparator for RemoteSeparator {
    fn name(&self) -> &'static str {
        "remote-separator"
    }

    async fn separate(
        &self,
        waveform: &Waveform,
        components: &[Component],
    ) -> Result<StemMap, SeparationError> {
        let url = format!("{}/separate", self.base_url);
        debug!(%url, components = components.len(), "Requesting separation");

        let response = self
            .http_client
            .post(&url)
            .json(&SeparateRequest {
                sample_rate: waveform.sample_rate(),
                samples: waveform.samples(),
                components,
            })
            .send()
            .await
            .map_err(|e| SeparationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SeparationError::Request(format!("HTTP {}: {}", status, body)));
        }

        let parsed: SeparateResponse = response
            .json()
            .await
            .map_err(|e| SeparationError::InvalidOutput(e.to_string()))?;

        let mut stems = StemMap::with_capacity(parsed.stems.len());
        for (name, stem) in parsed.stems {
            match name.parse::<Component>() {
                Ok(component) => {
                    stems.insert(
                        component,
                        ComponentArtifact {
                            component,
                            waveform: Waveform::new(stem.samples, stem.sample_rate),
                        },
                    );
                }
                Err(_) => warn!(stem = %name, "Separator returned unknown stem, skipping"),
            }
        }
        Ok(stems)
    }
}

/// Per-component anomaly classification over HTTP
pub struct RemoteClassifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl RemoteClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl ComponentClassifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote-classifier"
    }

    async fn classify(&self, artifact: &ComponentArtifact) -> Result<Classification, ClassificationError> {
        let url = format!("{}/classify/{}", self.base_url, artifact.component);

        let response = self
            .http_client
            .post(&url)
            .json(&ClassifyRequest {
                sample_rate: artifact.waveform.sample_rate(),
                samples: artifact.waveform.samples(),
            })
            .send()
            .await
            .map_err(|e| ClassificationError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClassificationError::ModelUnavailable(artifact.component)),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(ClassificationError::Request(format!("HTTP {}: {}", status, body)))
            }
            _ => {
                let parsed: ClassifyResponse = response
                    .json()
                    .await
                    .map_err(|e| ClassificationError::InvalidOutput(e.to_string()))?;
                Ok(Classification {
                    probability: parsed.anomaly_probability,
                    detected: parsed.anomaly_detected,
                })
            }
        }
    }
}
