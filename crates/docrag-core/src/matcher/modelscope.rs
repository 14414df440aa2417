//! Remote embedding backend over ModelScope's OpenAI-compatible API.

use crate::error::{Error, Result};
use crate::matcher::{Matcher, select_model};
use async_trait::async_trait;
use serde::Deserialize;

const MODELSCOPE_BASE_URL: &str = "https://api-inference.modelscope.cn/v1";

/// A [`Matcher`] backed by ModelScope's `/embeddings` endpoint, grounded in
/// `modelscope_matcher.py`'s `OpenAI(base_url="https://api-inference.modelscope.cn/v1")`
/// client.
pub struct ModelScopeMatcher {
    client: reqwest::Client,
    api_key: String,
    model_zh: String,
    model_en: String,
    lang_threshold: f64,
    base_url: String,
}

impl ModelScopeMatcher {
    /// Build a matcher from the `MODELSCOPE_KEY` environment variable,
    /// loading a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `MODELSCOPE_KEY` isn't set.
    pub fn from_env(model_zh: String, model_en: String, lang_threshold: f64) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var("MODELSCOPE_KEY")
            .map_err(|_| Error::Config("MODELSCOPE_KEY not set in environment".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model_zh,
            model_en,
            lang_threshold,
            base_url: MODELSCOPE_BASE_URL.to_string(),
        })
    }

    /// Build a matcher pointed at a custom base URL (tests).
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
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl Matcher for ModelScopeMatcher {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = select_model(&self.model_zh, &self.model_en, texts, self.lang_threshold);
        let url = format!("{}/embeddings", self.base_url);

        let response: EmbeddingsResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": model, "input": texts }))
            .send()
            .await?
            .json()
            .await
            .map_err(|e| Error::Matcher(format!("failed to parse ModelScope response: {e}")))?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
