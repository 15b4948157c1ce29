//! Configuration module
//!
//! Sightgate is configured from the environment once at startup. Every value is
//! read and validated here and then handed to components at construction, so no
//! component reads the environment at call time.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::{
    ACCEPTED_CONTAINER, DEFAULT_AUTH_HEADER, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_SOURCE_CONTAINER,
    REJECTED_CONTAINER,
};

/// What the pipeline does when writing to the destination container fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Log the failure and report the invocation as successful.
    #[default]
    LogAndContinue,
    /// Fail the invocation.
    Propagate,
}

impl FromStr for WriteFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" | "log_and_continue" | "suppress" => Ok(WriteFailurePolicy::LogAndContinue),
            "propagate" | "fail" => Ok(WriteFailurePolicy::Propagate),
            _ => Err(anyhow::anyhow!(
                "WRITE_FAILURE_POLICY must be 'log' or 'propagate', got '{}'",
                s
            )),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                s
            )),
        }
    }
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Vision service subscription key
    pub api_key: String,
    /// Vision service base URL, without a trailing slash
    pub vision_endpoint: String,
    /// Header name the subscription key is sent under
    pub auth_header: String,
    /// Connection string for source and destination storage
    pub storage_connection: String,
    pub source_container: String,
    pub max_image_bytes: u64,
    pub write_failure_policy: WriteFailurePolicy,
    pub environment: String,
    pub log_format: LogFormat,
}

// Keeps the subscription key and storage credentials out of logs.
impl Debug for AppConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("vision_endpoint", &self.vision_endpoint)
            .field("auth_header", &self.auth_header)
            .field("storage_connection", &"<redacted>")
            .field("source_container", &self.source_container)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("write_failure_policy", &self.write_failure_policy)
            .field("environment", &self.environment)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment (and a `.env` file, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup and validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("API_KEY")
            .or_else(|| get("SubscriptionKey"))
            .ok_or_else(|| anyhow::anyhow!("API_KEY must be set for the vision service"))?;

        let vision_endpoint = get("VISION_ENDPOINT")
            .or_else(|| get("VisionEndpoint"))
            .ok_or_else(|| anyhow::anyhow!("VISION_ENDPOINT must be set for the vision service"))?
            .trim_end_matches('/')
            .to_string();

        let storage_connection = get("STORAGE_CONNECTION")
            .or_else(|| get("AzureWebJobsStorage"))
            .ok_or_else(|| anyhow::anyhow!("STORAGE_CONNECTION must be set"))?;

        let max_image_bytes = match get("MAX_IMAGE_BYTES") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("MAX_IMAGE_BYTES must be a valid number"))?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        let config = Self {
            api_key,
            vision_endpoint,
            auth_header: get("VISION_AUTH_HEADER").unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string()),
            storage_connection,
            source_container: get("SOURCE_CONTAINER")
                .unwrap_or_else(|| DEFAULT_SOURCE_CONTAINER.to_string()),
            max_image_bytes,
            write_failure_policy: get("WRITE_FAILURE_POLICY")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            environment: get("ENVIRONMENT")
                .or_else(|| get("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            log_format: get("LOG_FORMAT")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let endpoint = url::Url::parse(&self.vision_endpoint).map_err(|e| {
            anyhow::anyhow!("VISION_ENDPOINT must be a valid URL ({}): {}", e, self.vision_endpoint)
        })?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(anyhow::anyhow!(
                "VISION_ENDPOINT must use http or https, got '{}'",
                endpoint.scheme()
            ));
        }

        if self.auth_header.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(anyhow::anyhow!(
                "VISION_AUTH_HEADER is not a valid header name: {}",
                self.auth_header
            ));
        }

        if self.max_image_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_BYTES must be greater than zero"));
        }

        if self.source_container == ACCEPTED_CONTAINER || self.source_container == REJECTED_CONTAINER {
            return Err(anyhow::anyhow!(
                "SOURCE_CONTAINER cannot be one of the destination containers ('{}')",
                self.source_container
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("API_KEY", "secret-key"),
        ("VISION_ENDPOINT", "https://vision.example.com/vision/v1.0/"),
        ("STORAGE_CONNECTION", "memory://"),
    ];

    #[test]
    fn defaults_are_applied() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.vision_endpoint, "https://vision.example.com/vision/v1.0");
        assert_eq!(config.auth_header, "Ocp-Apim-Subscription-Key");
        assert_eq!(config.source_container, "uploaded");
        assert_eq!(config.max_image_bytes, i32::MAX as u64);
        assert_eq!(config.write_failure_policy, WriteFailurePolicy::LogAndContinue);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.is_production());
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = AppConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn legacy_variable_names_are_accepted() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SubscriptionKey", "legacy-key"),
            ("VisionEndpoint", "https://westeurope.api.cognitive.microsoft.com/vision/v1.0"),
            ("AzureWebJobsStorage", "UseDevelopmentStorage=true"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "legacy-key");
        assert_eq!(config.storage_connection, "UseDevelopmentStorage=true");
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = AppConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("VISION_ENDPOINT", "ftp://vision.example.com"),
            ("STORAGE_CONNECTION", "memory://"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_destination_as_source() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SOURCE_CONTAINER", "accepted"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn parses_policy_and_limits() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WRITE_FAILURE_POLICY", "propagate"));
        pairs.push(("MAX_IMAGE_BYTES", "1048576"));
        pairs.push(("LOG_FORMAT", "json"));
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.write_failure_policy, WriteFailurePolicy::Propagate);
        assert_eq!(config.max_image_bytes, 1_048_576);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_size_limit() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MAX_IMAGE_BYTES", "0"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
