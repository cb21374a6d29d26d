//! Analysis workflow
//!
//! - **ingest**: upload validation, staging and decoding
//! - **pipeline**: separation → classification → aggregation → post-processing
//! - **aggregation** / **alert_gate**: pure scoring and alert decision
//! - **post_process**: best-effort score upsert and alert publish
//! - **batch**: multi-upload runs with per-item isolation

pub mod aggregation;
pub mod alert_gate;
pub mod batch;
pub mod ingest;
pub mod pipeline;
pub mod post_process;

pub use alert_gate::{should_alert, ALERT_THRESHOLD};
pub use batch::{BatchCoordinator, BatchError, BatchItem, BatchItemResult, ItemFailure, MAX_BATCH_ITEMS};
pub use ingest::{AudioUpload, Ingestor, InputFormatError};
pub use pipeline::Pipeline;
pub use post_process::PostProcessor;
