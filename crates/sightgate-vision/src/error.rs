use thiserror::Error;

/// Errors from a classification call. None of them are retried.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid vision client configuration: {0}")]
    Config(String),

    #[error("Vision service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Vision service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse vision service response: {0}")]
    Decode(String),
}

impl ClassifyError {
    /// HTTP status of a rejected request, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
