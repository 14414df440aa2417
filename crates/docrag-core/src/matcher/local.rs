//! Local sentence-transformer backend, used for the fallback-2 local rerank
//! pass so it can run without an external API key.
//!
//! The Rust workspace carries no on-device inference crate (no `candle`,
//! `ort`, or `tch`), so rather than fabricate one, this talks to a small
//! local embedding server over HTTP — the same role `local_matcher.py`'s
//! in-process `sentence-transformers` model plays, moved behind a sidecar
//! process so the core crate stays free of ML-framework dependencies. See
//! DESIGN.md for this interpretation.

use crate::config::FallbackConfig;
use crate::error::{Error, Result};
use crate::matcher::{Matcher, select_model};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:8008";

/// A [`Matcher`] backed by a local embedding sidecar server.
pub struct LocalMatcher {
    client: reqwest::Client,
    model_zh: String,
    model_en: String,
    device: String,
    lang_threshold: f64,
    base_url: String,
}

impl LocalMatcher {
    /// Build a matcher from [`FallbackConfig`]'s `local_device`/`local_model_zh`/
    /// `local_model_en` fields, optionally overriding the sidecar's base URL via
    /// `DOCRAG_LOCAL_MATCHER_URL` (defaults to `http://127.0.0.1:8008`).
    #[must_use]
    pub fn from_config(fallback: &FallbackConfig, lang_threshold: f64) -> Self {
        let base_url = std::env::var("DOCRAG_LOCAL_MATCHER_URL").unwrap_or_else(|_| DEFAULT_LOCAL_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            model_zh: fallback.local_model_zh.clone(),
            model_en: fallback.local_model_en.clone(),
            device: fallback.local_device.clone(),
            lang_threshold,
            base_url,
        }
    }

    /// Build a matcher pointed at a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(model_zh: String, model_en: String, device: String, lang_threshold: f64, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            model_zh,
            model_en,
            device,
            lang_threshold,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocalEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Matcher for LocalMatcher {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = select_model(&self.model_zh, &self.model_en, texts, self.lang_threshold);
        let url = format!("{}/encode", self.base_url);

        let response: LocalEmbedResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model, "device": self.device, "texts": texts }))
            .send()
            .await
            .map_err(|e| Error::Matcher(format!("local matcher sidecar unreachable: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Matcher(format!("failed to parse local matcher response: {e}")))?;

        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn encode_parses_local_sidecar_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/encode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let matcher = LocalMatcher::with_base_url(
            "zh-model".to_string(),
            "en-model".to_string(),
            "cpu".to_string(),
            0.9,
            server.uri(),
        );

        let embeddings = matcher.encode(&["hello".to_string()]).await.unwrap();
        assert_eq!(embeddings, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[tokio::test]
    async fn encode_empty_texts_skips_request() {
        let matcher = LocalMatcher::with_base_url(
            "zh-model".to_string(),
            "en-model".to_string(),
            "cpu".to_string(),
            0.9,
            "http://127.0.0.1:0".to_string(),
        );
        assert_eq!(matcher.encode(&[]).await.unwrap(), Vec::<Vec<f32>>::new());
    }

    #[tokio::test]
    async fn encode_surfaces_unreachable_sidecar_error() {
        let matcher = LocalMatcher::with_base_url(
            "zh-model".to_string(),
            "en-model".to_string(),
            "cpu".to_string(),
            0.9,
            "http://127.0.0.1:1".to_string(),
        );
        let result = matcher.encode(&["hello".to_string()]).await;
        assert!(matches!(result, Err(Error::Matcher(_))));
    }
}
