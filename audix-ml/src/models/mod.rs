//! Data models for audix-ml
//!
//! - Recordings entering the pipeline
//! - Per-component and device-level analysis results
//! - Tagged terminal failures and side-effect status

pub mod analysis;
pub mod recording;

pub use analysis::{
    AnalysisOutcome, ComponentFailure, ComponentFailureKind, ComponentResult, PipelineFailure,
    PipelineStage, PostProcessReport, RunReport, SideEffectStatus,
};
pub use recording::{DeviceId, Recording, Waveform};
