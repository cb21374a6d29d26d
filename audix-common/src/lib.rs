//! # Audix Common Library
//!
//! Shared code for the Audix services:
//! - Error type
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Event types (`AudixEvent`) and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{AudixEvent, EventBus};
