//! Sightgate Core Library
//!
//! This crate provides the domain models, metadata encoding, configuration and
//! constants shared by every Sightgate component.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{AppConfig, LogFormat, WriteFailurePolicy};
pub use models::{
    format_flag, format_score, route, ClassificationResult, Destination, DestinationRecord,
    ImageBytes, ObjectMetadata,
};
pub use storage_types::StorageBackend;
