use sightgate_core::{
    AppConfig, ClassificationResult, Destination, DestinationRecord, ObjectMetadata,
    WriteFailurePolicy,
};
use sightgate_storage::{BlobReader, Storage, StorageError};
use sightgate_vision::{ClassifyError, Classifier};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::loader::{load_image, LoadError};
use crate::writer::{DestinationWriter, WriteError};

/// A newly uploaded object, as delivered by the host.
#[derive(Debug)]
pub struct BlobTrigger {
    pub name: String,
    pub blob: BlobReader,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to open source object: {0}")]
    Source(#[from] StorageError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result of one invocation that got past classification.
#[derive(Debug)]
pub struct ModerationOutcome {
    pub name: String,
    pub destination: Destination,
    pub classification: ClassificationResult,
    pub metadata: ObjectMetadata,
    /// Set when the destination write failed and the policy let the
    /// invocation finish anyway.
    pub write_error: Option<WriteError>,
}

impl ModerationOutcome {
    /// Whether the object and its metadata both reached the destination.
    pub fn stored(&self) -> bool {
        self.write_error.is_none()
    }
}

/// Load, classify and route a single image.
///
/// Holds only shared immutable handles, so one pipeline can serve concurrent
/// invocations.
#[derive(Clone)]
pub struct ModerationPipeline {
    classifier: Arc<dyn Classifier>,
    writer: DestinationWriter,
    max_image_bytes: u64,
    policy: WriteFailurePolicy,
}

impl ModerationPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        storage: Arc<dyn Storage>,
        max_image_bytes: u64,
        policy: WriteFailurePolicy,
    ) -> Self {
        Self {
            classifier,
            writer: DestinationWriter::new(storage),
            max_image_bytes,
            policy,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        classifier: Arc<dyn Classifier>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self::new(
            classifier,
            storage,
            config.max_image_bytes,
            config.write_failure_policy,
        )
    }

    /// Open `container/name` from storage and run it through the pipeline.
    pub async fn process(
        &self,
        container: &str,
        name: &str,
    ) -> Result<ModerationOutcome, PipelineError> {
        let blob = self.writer.storage().open(container, name).await?;
        self.run(BlobTrigger {
            name: name.to_string(),
            blob,
        })
        .await
    }

    /// Run one invocation inside its own `moderate` span.
    pub async fn run(&self, trigger: BlobTrigger) -> Result<ModerationOutcome, PipelineError> {
        let span = tracing::info_span!(
            "moderate",
            invocation_id = %Uuid::new_v4(),
            name = %trigger.name
        );
        self.moderate(trigger).instrument(span).await
    }

    async fn moderate(&self, trigger: BlobTrigger) -> Result<ModerationOutcome, PipelineError> {
        let BlobTrigger { name, mut blob } = trigger;
        let start = std::time::Instant::now();

        let image = load_image(&mut blob.reader, blob.length, self.max_image_bytes).await?;

        let classification = self.classifier.classify(&image).await.map_err(|e| {
            tracing::error!(error = %e, "Image classification failed");
            e
        })?;

        let record = DestinationRecord::from_classification(&classification);
        let write_error = match self.writer.write(&name, &mut blob.reader, &record).await {
            Ok(_) => None,
            Err(e) => match self.policy {
                WriteFailurePolicy::Propagate => {
                    tracing::error!(
                        error = %e,
                        stage = %e.stage,
                        destination = %record.destination,
                        "Failed to store image"
                    );
                    return Err(e.into());
                }
                WriteFailurePolicy::LogAndContinue => {
                    tracing::warn!(
                        error = %e,
                        stage = %e.stage,
                        destination = %record.destination,
                        object_written = e.object_written(),
                        "Failed to store image, continuing"
                    );
                    Some(e)
                }
            },
        };

        tracing::info!(
            destination = %record.destination,
            request_id = %classification.request_id,
            stored = write_error.is_none(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Moderation completed"
        );

        Ok(ModerationOutcome {
            name,
            destination: record.destination,
            classification,
            metadata: record.metadata,
            write_error,
        })
    }
}
