//! Default [`LlmClient`] implementation: an Anthropic Messages API adapter.
//!
//! This is the one concrete collaborator stages 0a/0b/1.5 drive through the
//! [`LlmClient`] trait; swapping in another provider only requires a new
//! impl of that trait, matching `transformer_matcher.py`'s
//! provider-behind-a-capability pattern on the embedding side.

use crate::error::{Error, Result};
use crate::llm::{ContentBlock, LlmClient, LlmMessage, LlmResponse};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// An [`LlmClient`] backed by the Anthropic Messages API.
///
/// Reads `ANTHROPIC_API_KEY` from the environment (via `dotenv`, like the
/// embedding matchers) unless constructed with an explicit key.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    /// Build a client from `ANTHROPIC_API_KEY`, loading a `.env` file first
    /// if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable isn't set.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| Error::Config("ANTHROPIC_API_KEY not set in environment".to_string()))?;
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: DEFAULT_BASE_URL.to_string() })
    }

    /// Build a client pointed at a custom base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { client: reqwest::Client::new(), api_key, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    Thinking { thinking: String },
    #[serde(other)]
    Unknown,
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn invoke(
        &self,
        model: &str,
        system: &str,
        messages: &[LlmMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse> {
        let payload = serde_json::json!({
            "model": model,
            "system": system,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": messages.iter().map(|m| serde_json::json!({
                "role": m.role,
                "content": m.content,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("API returned {status}: {body}")));
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| Error::Llm(format!("failed to parse response: {e}")))?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text(text)),
                ResponseBlock::Thinking { thinking } => Some(ContentBlock::Thinking(thinking)),
                ResponseBlock::Unknown => None,
            })
            .collect();

        Ok(LlmResponse { content })
    }
}
