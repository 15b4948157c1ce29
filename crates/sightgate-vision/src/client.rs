use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_TYPE};
use reqwest::Client;
use sightgate_core::{AppConfig, ClassificationResult, ImageBytes};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::error::ClassifyError;
use crate::response::AnalysisResponse;
use crate::Classifier;

pub const ANALYZE_PATH: &str = "/analyze";
pub const VISUAL_FEATURES: &str = "Adult";

/// HTTP client for the vision service's `analyze` operation.
///
/// One POST per image, raw bytes in the body. No retries and no request
/// timeout beyond the transport's own.
#[derive(Clone)]
pub struct VisionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    auth_header: HeaderName,
}

impl Debug for VisionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VisionClient")
            .field("endpoint", &self.endpoint)
            .field("auth_header", &self.auth_header)
            .finish_non_exhaustive()
    }
}

impl VisionClient {
    pub fn new(endpoint: &str, api_key: &str, auth_header: &str) -> Result<Self, ClassifyError> {
        let auth_header = HeaderName::from_bytes(auth_header.as_bytes()).map_err(|e| {
            ClassifyError::Config(format!("invalid auth header name '{}': {}", auth_header, e))
        })?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(ClassifyError::Config("endpoint is empty".to_string()));
        }

        let http = Client::builder().build().map_err(ClassifyError::Client)?;

        Ok(Self {
            http,
            endpoint,
            api_key: api_key.to_string(),
            auth_header,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifyError> {
        Self::new(&config.vision_endpoint, &config.api_key, &config.auth_header)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn analyze_url(&self) -> String {
        format!("{}{}", self.endpoint, ANALYZE_PATH)
    }
}

#[async_trait]
impl Classifier for VisionClient {
    async fn classify(&self, image: &ImageBytes) -> Result<ClassificationResult, ClassifyError> {
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(self.analyze_url())
            .query(&[("visualFeatures", VISUAL_FEATURES)])
            .header(self.auth_header.clone(), self.api_key.as_str())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_bytes())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                status = status.as_u16(),
                size_bytes = image.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Vision service rejected request"
            );
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let parsed: AnalysisResponse =
            serde_json::from_slice(&body).map_err(|e| ClassifyError::Decode(e.to_string()))?;
        let result = ClassificationResult::from(parsed);

        tracing::info!(
            request_id = %result.request_id,
            is_adult_content = result.is_adult_content,
            is_racy_content = result.is_racy_content,
            size_bytes = image.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image classified"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CLEAN: &str = r#"{
        "adult": {
            "isAdultContent": false,
            "isRacyContent": false,
            "adultScore": 0.02,
            "racyScore": 0.01
        },
        "requestId": "req-clean"
    }"#;

    fn image() -> ImageBytes {
        ImageBytes::new(vec![0xFFu8, 0xD8, 0xFF, 0xE0])
    }

    #[tokio::test]
    async fn test_classify_sends_raw_bytes_with_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vision/v2.0/analyze")
            .match_query(Matcher::UrlEncoded("visualFeatures".into(), "Adult".into()))
            .match_header("Ocp-Apim-Subscription-Key", "secret")
            .match_header("content-type", "application/octet-stream")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CLEAN)
            .create_async()
            .await;

        let endpoint = format!("{}/vision/v2.0/", server.url());
        let client = VisionClient::new(&endpoint, "secret", "Ocp-Apim-Subscription-Key").unwrap();
        let result = client.classify(&image()).await.unwrap();

        mock.assert_async().await;
        assert!(!result.is_flagged());
        assert_eq!(result.adult_score, 0.02);
        assert_eq!(result.request_id, "req-clean");
    }

    #[tokio::test]
    async fn test_custom_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .match_query(Matcher::Any)
            .match_header("x-api-key", "k")
            .with_status(200)
            .with_body(CLEAN)
            .create_async()
            .await;

        let client = VisionClient::new(&server.url(), "k", "X-Api-Key").unwrap();
        client.classify(&image()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("internal failure")
            .create_async()
            .await;

        let client = VisionClient::new(&server.url(), "k", "Ocp-Apim-Subscription-Key").unwrap();
        let err = client.classify(&image()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        match err {
            ClassifyError::Status { body, .. } => assert_eq!(body, "internal failure"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"requestId": "x"}"#)
            .create_async()
            .await;

        let client = VisionClient::new(&server.url(), "k", "Ocp-Apim-Subscription-Key").unwrap();
        let err = client.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client =
            VisionClient::new("http://127.0.0.1:9", "k", "Ocp-Apim-Subscription-Key").unwrap();
        let err = client.classify(&image()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Transport(_)));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let result = VisionClient::new("http://localhost", "k", "bad header");
        assert!(matches!(result, Err(ClassifyError::Config(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = VisionClient::new("http://localhost/", "secret", "X-Key").unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
        assert_eq!(client.endpoint(), "http://localhost");
    }
}
