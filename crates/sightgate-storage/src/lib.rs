//! Sightgate Storage Library
//!
//! This crate provides the storage abstraction used by the moderation pipeline
//! and its backends: the local filesystem and anything `object_store` can talk
//! to (S3, Azure Blob Storage, in-memory).
//!
//! # Addressing
//!
//! Objects are addressed by `(container, name)`. Containers are the fixed
//! `uploaded` / `accepted` / `rejected` locations; names come from the trigger.
//! Validation of both lives in the `keys` module so all backends agree.

pub mod factory;
pub mod keys;
pub mod local;
pub mod object;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use object::ObjectStorage;
pub use sightgate_core::StorageBackend;
pub use traits::{AsyncReadSeek, BlobReader, Storage, StorageError, StorageResult};
