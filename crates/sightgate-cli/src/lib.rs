use serde::Serialize;
use sightgate_core::{Destination, LogFormat, ObjectMetadata};
use sightgate_pipeline::{ModerationOutcome, PipelineError};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "sightgate=info";

/// One line of CLI output per processed object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeLine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub stored: bool,
    #[serde(skip_serializing_if = "ObjectMetadata::is_empty")]
    pub metadata: ObjectMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeLine {
    pub fn from_result(name: &str, result: &Result<ModerationOutcome, PipelineError>) -> Self {
        match result {
            Ok(outcome) => Self {
                name: outcome.name.clone(),
                destination: Some(outcome.destination),
                request_id: Some(outcome.classification.request_id.clone()),
                stored: outcome.stored(),
                metadata: outcome.metadata.clone(),
                error: outcome.write_error.as_ref().map(|e| e.to_string()),
            },
            Err(e) => Self {
                name: name.to_string(),
                destination: None,
                request_id: None,
                stored: false,
                metadata: ObjectMetadata::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
