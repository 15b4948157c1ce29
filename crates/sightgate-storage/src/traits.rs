//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use sightgate_core::ObjectMetadata;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Metadata operation failed: {0}")]
    MetadataFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A reader that can be rewound, as the loader requires.
pub trait AsyncReadSeek: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> AsyncReadSeek for T {}

/// An opened object: a seekable reader plus the length the backend declared for it.
pub struct BlobReader {
    pub reader: Pin<Box<dyn AsyncReadSeek>>,
    pub length: u64,
}

impl BlobReader {
    pub fn new(reader: impl AsyncReadSeek + 'static, length: u64) -> Self {
        Self {
            reader: Box::pin(reader),
            length,
        }
    }
}

impl Debug for BlobReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BlobReader")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Storage abstraction trait
///
/// All storage backends (local filesystem, object stores) implement this trait so
/// the pipeline never couples to a specific backend. Writing an object and
/// attaching metadata to it are separate calls: an object can exist with its
/// bytes while a later metadata call fails.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open an object for reading. The returned reader starts at offset 0.
    async fn open(&self, container: &str, name: &str) -> StorageResult<BlobReader>;

    /// List object names in a container, sorted.
    async fn list(&self, container: &str) -> StorageResult<Vec<String>>;

    /// Write the full contents of `reader` to `container/name`, creating or
    /// replacing the object. Returns the number of bytes written.
    async fn put_stream(
        &self,
        container: &str,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64>;

    /// Fetch the current metadata mapping of an existing object.
    async fn fetch_metadata(&self, container: &str, name: &str) -> StorageResult<ObjectMetadata>;

    /// Replace the metadata mapping of an existing object.
    async fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
