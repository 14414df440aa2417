//! QueryRouter: via LLM, classify a query into one of
//! seven scenes and emit confidence/ambiguity/coverage-need plus a
//! recommended rerank threshold.

use crate::llm::json_extract::extract_json_from_codeblock;
use crate::llm::{LlmClient, LlmMessage};
use crate::types::{RoutingResult, Scene};
use serde::Deserialize;

/// Configuration for [`route`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Model id to invoke.
    pub model: String,
    /// Max tokens the model may generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// System prompt (scene taxonomy + scoring instructions).
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
struct RouterPayload {
    scene: Scene,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    ambiguity: f32,
    #[serde(default)]
    coverage_need: f32,
    #[serde(default = "default_reranker_threshold")]
    reranker_threshold: f32,
}

const fn default_reranker_threshold() -> f32 {
    0.68
}

/// Classify `query` into a [`RoutingResult`].
///
/// Falls back to `Scene::Exploration` with zeroed confidence/coverage and
/// the default reranker threshold if the LLM response doesn't parse — an
/// exploratory scene is the safest default when routing is uncertain.
///
/// # Errors
///
/// Returns an error only if the underlying LLM call itself fails.
pub async fn route(client: &dyn LlmClient, config: &RouterConfig, query: &str) -> crate::error::Result<RoutingResult> {
    let response = client
        .invoke(
            &config.model,
            &config.system_prompt,
            &[LlmMessage::user(query)],
            config.max_tokens,
            config.temperature,
        )
        .await?;

    let Some(raw) = response.text() else {
        return Ok(fallback_routing());
    };

    let parsed = extract_json_from_codeblock(&raw).and_then(|v| serde_json::from_value::<RouterPayload>(v).ok());
    Ok(match parsed {
        Some(payload) => RoutingResult {
            scene: payload.scene,
            confidence: payload.confidence.clamp(0.0, 1.0),
            ambiguity: payload.ambiguity.clamp(0.0, 1.0),
            coverage_need: payload.coverage_need.clamp(0.0, 1.0),
            reranker_threshold: payload.reranker_threshold.clamp(0.30, 0.80),
        },
        None => fallback_routing(),
    })
}

fn fallback_routing() -> RoutingResult {
    RoutingResult {
        scene: Scene::Exploration,
        confidence: 0.0,
        ambiguity: 1.0,
        coverage_need: 1.0,
        reranker_threshold: default_reranker_threshold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentBlock, LlmResponse};
    use async_trait::async_trait;

    struct StubClient {
        response_text: String,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn invoke(
            &self,
            _model: &str,
            _system: &str,
            _messages: &[LlmMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> crate::error::Result<LlmResponse> {
            Ok(LlmResponse { content: vec![ContentBlock::Text(self.response_text.clone())] })
        }
    }

    fn config() -> RouterConfig {
        RouterConfig {
            model: "test-model".to_string(),
            max_tokens: 500,
            temperature: 0.0,
            system_prompt: "classify".to_string(),
        }
    }

    #[tokio::test]
    async fn parses_how_to_scene() {
        let client = StubClient {
            response_text: r#"```json
{"scene": "how_to", "confidence": 0.9, "ambiguity": 0.1, "coverage_need": 0.4, "reranker_threshold": 0.65}
```"#
                .to_string(),
        };
        let result = route(&client, &config(), "how do I configure this").await.unwrap();
        assert_eq!(result.scene, Scene::HowTo);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn clamps_out_of_range_threshold() {
        let client = StubClient {
            response_text: r#"```json
{"scene": "fact_lookup", "reranker_threshold": 0.95}
```"#
                .to_string(),
        };
        let result = route(&client, &config(), "q").await.unwrap();
        assert_eq!(result.reranker_threshold, 0.80);
    }

    #[tokio::test]
    async fn malformed_response_falls_back_to_exploration() {
        let client = StubClient { response_text: "garbage".to_string() };
        let result = route(&client, &config(), "q").await.unwrap();
        assert_eq!(result.scene, Scene::Exploration);
    }
}
