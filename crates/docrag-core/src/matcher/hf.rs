//! Remote embedding backend over the Hugging Face Inference API.

use crate::error::{Error, Result};
use crate::matcher::{Matcher, select_model};
use async_trait::async_trait;
use serde::Deserialize;

const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// A [`Matcher`] backed by Hugging Face's hosted feature-extraction endpoint.
///
/// Reads `HF_KEY` (required) and `HF_PROXY` (optional, routed through
/// `reqwest`'s proxy support) from the environment via `dotenv`, matching
/// `transformer_matcher.py`'s `.env`-file loading.
pub struct HfMatcher {
    client: reqwest::Client,
    api_key: String,
    model_zh: String,
    model_en: String,
    lang_threshold: f64,
    base_url: String,
}

impl HfMatcher {
    /// Build a matcher from environment variables, loading a `.env` file
    /// first if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `HF_KEY` isn't set.
    pub fn from_env(model_zh: String, model_en: String, lang_threshold: f64) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var("HF_KEY")
            .map_err(|_| Error::Config("HF_KEY not set in environment".to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Ok(proxy_url) = std::env::var("HF_PROXY") {
            if let Ok(proxy) = reqwest::Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }
        let client = builder
            .build()
            .map_err(|e| Error::Matcher(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model_zh,
            model_en,
            lang_threshold,
            base_url: INFERENCE_BASE_URL.to_string(),
        })
    }

    /// Build a matcher pointed at a custom base URL (tests, self-hosted proxies).
    #[must_use]
    pub fn with_base_url(api_key: String, model_zh: String, model_en: String, lang_threshold: f64, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model_zh,
            model_en,
            lang_threshold,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Matrix(Vec<Vec<f32>>),
    Error { error: String },
}

#[async_trait]
impl Matcher for HfMatcher {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = select_model(&self.model_zh, &self.model_en, texts, self.lang_threshold);
        let url = format!("{}/{model}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "inputs": texts }))
            .send()
            .await?
            .json::<FeatureExtractionResponse>()
            .await
            .map_err(|e| Error::Matcher(format!("failed to parse HF response: {e}")))?;

        match response {
            FeatureExtractionResponse::Matrix(vectors) => Ok(vectors),
            FeatureExtractionResponse::Error { error } => Err(Error::Matcher(format!("HF inference error: {error}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn encode_parses_feature_extraction_matrix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0.1, 0.2], [0.3, 0.4]])))
            .mount(&server)
            .await;

        let matcher = HfMatcher::with_base_url(
            "test-key".to_string(),
            "zh-model".to_string(),
            "en-model".to_string(),
            0.9,
            server.uri(),
        );

        let embeddings = matcher
            .encode(&["hello".to_string(), "world".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn encode_surfaces_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": "model loading" })))
            .mount(&server)
            .await;

        let matcher = HfMatcher::with_base_url(
            "test-key".to_string(),
            "zh-model".to_string(),
            "en-model".to_string(),
            0.9,
            server.uri(),
        );

        let result = matcher.encode(&["hello".to_string()]).await;
        assert!(matches!(result, Err(Error::Matcher(_))));
    }

    #[tokio::test]
    async fn encode_empty_texts_skips_request() {
        let matcher = HfMatcher::with_base_url(
            "test-key".to_string(),
            "zh-model".to_string(),
            "en-model".to_string(),
            0.9,
            "http://127.0.0.1:0".to_string(),
        );
        assert_eq!(matcher.encode(&[]).await.unwrap(), Vec::<Vec<f32>>::new());
    }
}
