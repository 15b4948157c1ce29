//! Sightgate Pipeline
//!
//! One moderation invocation per uploaded image: the loader buffers the
//! triggering stream, the classifier scores it, and the writer stores it in
//! `accepted` or `rejected` with the classification attached as metadata.

pub mod loader;
pub mod pipeline;
pub mod writer;

pub use loader::{load_image, LoadError};
pub use pipeline::{BlobTrigger, ModerationOutcome, ModerationPipeline, PipelineError};
pub use writer::{DestinationWriter, WriteError, WriteStage};
