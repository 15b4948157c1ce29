//! Sightgate Vision
//!
//! Client for the remote image-analysis service. The pipeline depends only on
//! the [`Classifier`] trait; [`VisionClient`] is the HTTP implementation.

mod client;
mod error;
mod response;

use async_trait::async_trait;
use sightgate_core::{ClassificationResult, ImageBytes};

pub use client::{VisionClient, ANALYZE_PATH, VISUAL_FEATURES};
pub use error::ClassifyError;
pub use response::{AdultInfo, AnalysisResponse};

/// Produces one classification per image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImageBytes) -> Result<ClassificationResult, ClassifyError>;
}
