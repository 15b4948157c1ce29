use sightgate_core::DestinationRecord;
use sightgate_storage::{keys, Storage, StorageError};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Step of the destination write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    ValidateName,
    ResolveContainer,
    Upload,
    FetchMetadata,
    SetMetadata,
}

impl Display for WriteStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let stage = match self {
            WriteStage::ValidateName => "validate name",
            WriteStage::ResolveContainer => "resolve container",
            WriteStage::Upload => "upload",
            WriteStage::FetchMetadata => "fetch metadata",
            WriteStage::SetMetadata => "set metadata",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
#[error("Failed to {stage} for {container}/{name}: {source}")]
pub struct WriteError {
    pub stage: WriteStage,
    pub container: String,
    pub name: String,
    #[source]
    pub source: StorageError,
}

impl WriteError {
    /// Whether the bytes reached the destination before the failure.
    pub fn object_written(&self) -> bool {
        matches!(self.stage, WriteStage::FetchMetadata | WriteStage::SetMetadata)
    }
}

/// Writes routed images and their classification metadata.
#[derive(Clone)]
pub struct DestinationWriter {
    storage: Arc<dyn Storage>,
}

impl DestinationWriter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store `reader` as `name` in the record's container, then merge the
    /// record's metadata into whatever the object already carries.
    ///
    /// The bytes are written before metadata is touched, so a metadata failure
    /// leaves the object in place without classification keys.
    pub async fn write(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        record: &DestinationRecord,
    ) -> Result<u64, WriteError> {
        let container = record.container();
        let fail = |stage: WriteStage, source: StorageError| WriteError {
            stage,
            container: container.to_string(),
            name: name.to_string(),
            source,
        };

        keys::validate_name(name).map_err(|e| fail(WriteStage::ValidateName, e))?;

        let size = self
            .storage
            .put_stream(container, name, reader)
            .await
            .map_err(|e| match e {
                StorageError::ContainerNotFound(_) | StorageError::InvalidKey(_) => {
                    fail(WriteStage::ResolveContainer, e)
                }
                other => fail(WriteStage::Upload, other),
            })?;

        let mut metadata = self
            .storage
            .fetch_metadata(container, name)
            .await
            .map_err(|e| fail(WriteStage::FetchMetadata, e))?;
        metadata.extend(record.metadata.clone());

        self.storage
            .set_metadata(container, name, &metadata)
            .await
            .map_err(|e| fail(WriteStage::SetMetadata, e))?;

        tracing::info!(
            destination = %record.destination,
            name = %name,
            size_bytes = size,
            "Image stored with classification metadata"
        );

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightgate_core::{ClassificationResult, Destination};
    use sightgate_storage::{LocalStorage, ObjectStorage};

    fn record(adult: bool, racy: bool) -> DestinationRecord {
        DestinationRecord::from_classification(&ClassificationResult {
            is_adult_content: adult,
            adult_score: 0.4,
            is_racy_content: racy,
            racy_score: 0.6,
            request_id: "r".to_string(),
        })
    }

    #[tokio::test]
    async fn test_writes_bytes_then_metadata() {
        let storage = Arc::new(ObjectStorage::in_memory());
        let writer = DestinationWriter::new(storage.clone());

        let mut data: &[u8] = b"image";
        let size = writer
            .write("cat.jpg", &mut data, &record(false, true))
            .await
            .unwrap();
        assert_eq!(size, 5);

        let metadata = storage.fetch_metadata("rejected", "cat.jpg").await.unwrap();
        assert_eq!(metadata.len(), 4);
        assert_eq!(metadata["isRacyContent"], "True");
        assert_eq!(metadata["adultScore"], "40%");
        assert_eq!(metadata["racyScore"], "60%");
        assert!(storage.list("accepted").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let writer = DestinationWriter::new(storage.clone());

        let mut data: &[u8] = b"clean";
        writer
            .write("2024/dog.png", &mut data, &record(false, false))
            .await
            .unwrap();

        assert!(dir.path().join("accepted/2024/dog.png").exists());
        let metadata = storage
            .fetch_metadata(Destination::Accepted.container(), "2024/dog.png")
            .await
            .unwrap();
        assert_eq!(metadata["isAdultContent"], "False");
    }

    #[tokio::test]
    async fn test_invalid_name_fails_validation_before_upload() {
        let writer = DestinationWriter::new(Arc::new(ObjectStorage::in_memory()));
        let mut data: &[u8] = b"x";

        let err = writer
            .write("../escape.jpg", &mut data, &record(true, true))
            .await
            .unwrap_err();

        assert_eq!(err.stage, WriteStage::ValidateName);
        assert_eq!(err.container, "rejected");
        assert!(!err.object_written());
    }
}
