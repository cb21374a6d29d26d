//! Batch coordination
//!
//! Runs independent uploads through ingestion and the pipeline with per-item failure
//! isolation. Results are returned in input order.

use super::ingest::{AudioUpload, Ingestor, InputFormatError};
use super::pipeline::Pipeline;
use crate::models::{DeviceId, PipelineFailure, RunReport};
use crate::types::ComponentSelection;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Maximum number of items accepted in one batch
pub const MAX_BATCH_ITEMS: usize = 10;

/// One batch entry
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub upload: AudioUpload,
    pub device_id: DeviceId,
    pub requested: Option<ComponentSelection>,
}

/// Whole-batch rejection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Batch of {submitted} items exceeds the maximum of {max}")]
    TooLarge { submitted: usize, max: usize },
}

/// Failure of a single batch item
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error(transparent)]
    InputFormat(#[from] InputFormatError),

    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
}

impl ItemFailure {
    /// Stage label ("input", "separation", "aggregation")
    pub fn stage(&self) -> &'static str {
        match self {
            ItemFailure::InputFormat(_) => "input",
            ItemFailure::Pipeline(failure) => failure.stage.as_str(),
        }
    }
}

/// Result for one batch position
#[derive(Debug)]
pub struct BatchItemResult {
    /// 0-based position in the submitted batch
    pub index: usize,
    pub filename: String,
    pub device_id: DeviceId,
    pub result: Result<RunReport, ItemFailure>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs batches over a shared pipeline
pub struct BatchCoordinator {
    pipeline: Arc<Pipeline>,
    ingestor: Ingestor,
    concurrency: usize,
}

impl BatchCoordinator {
    /// `concurrency` is clamped to `1..=MAX_BATCH_ITEMS`
    pub fn new(pipeline: Arc<Pipeline>, ingestor: Ingestor, concurrency: usize) -> Self {
        Self {
            pipeline,
            ingestor,
            concurrency: concurrency.clamp(1, MAX_BATCH_ITEMS),
        }
    }

    pub fn max_items(&self) -> usize {
        MAX_BATCH_ITEMS
    }

    /// Process every item; one result per item, in input order
    ///
    /// # Errors
    /// `BatchError::TooLarge` before any item is touched when the batch exceeds the cap.
    pub async fn run_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchItemResult>, BatchError> {
        if items.len() > MAX_BATCH_ITEMS {
            return Err(BatchError::TooLarge {
                submitted: items.len(),
                max: MAX_BATCH_ITEMS,
            });
        }

        let total = items.len();
        info!(items = total, concurrency = self.concurrency, "Batch started");

        // buffered (not buffer_unordered) keeps results in submission order
        let results: Vec<BatchItemResult> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| self.run_item(index, item))
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(items = total, succeeded, failed = total - succeeded, "Batch complete");

        Ok(results)
    }

    async fn run_item(&self, index: usize, item: BatchItem) -> BatchItemResult {
        let filename = item.upload.filename.clone();
        let device_id = item.device_id.clone();

        let result = match self
            .ingestor
            .ingest(item.upload, item.device_id, item.requested)
            .await
        {
            Ok(recording) => self.pipeline.run(&recording).await.map_err(ItemFailure::from),
            Err(e) => Err(ItemFailure::from(e)),
        };

        if let Err(e) = &result {
            warn!(index, %filename, %device_id, stage = e.stage(), "Batch item failed: {}", e);
        }

        BatchItemResult {
            index,
            filename,
            device_id,
            result,
        }
    }
}
