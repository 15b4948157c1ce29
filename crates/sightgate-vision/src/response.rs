use serde::Deserialize;
use sightgate_core::ClassificationResult;

/// Body of a successful `analyze` call. Only the adult block is requested;
/// any other fields the service sends are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub adult: AdultInfo,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdultInfo {
    pub is_adult_content: bool,
    pub is_racy_content: bool,
    pub adult_score: f32,
    pub racy_score: f32,
}

impl From<AnalysisResponse> for ClassificationResult {
    fn from(response: AnalysisResponse) -> Self {
        ClassificationResult {
            is_adult_content: response.adult.is_adult_content,
            adult_score: response.adult.adult_score,
            is_racy_content: response.adult.is_racy_content,
            racy_score: response.adult.racy_score,
            request_id: response.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_unknown_fields() {
        let body = r#"{
            "adult": {
                "isAdultContent": false,
                "isRacyContent": true,
                "isGoryContent": false,
                "adultScore": 0.12,
                "racyScore": 0.81,
                "goreScore": 0.01
            },
            "requestId": "abc-123",
            "metadata": { "width": 640, "height": 480, "format": "Jpeg" }
        }"#;

        let result: ClassificationResult = serde_json::from_str::<AnalysisResponse>(body)
            .unwrap()
            .into();
        assert!(!result.is_adult_content);
        assert!(result.is_racy_content);
        assert_eq!(result.racy_score, 0.81);
        assert_eq!(result.request_id, "abc-123");
    }

    #[test]
    fn missing_adult_block_is_an_error() {
        let body = r#"{ "requestId": "abc-123" }"#;
        assert!(serde_json::from_str::<AnalysisResponse>(body).is_err());
    }
}
