//! QueryOptimizer: via LLM, produce optimized query
//! variants plus the `doc_sets`, `domain_nouns`, `predicate_verbs`, and
//! detected language that drive the rest of the pipeline.

use crate::llm::json_extract::extract_json_from_codeblock;
use crate::llm::{LlmClient, LlmMessage};
use serde::{Deserialize, Serialize};

/// Configuration for [`optimize`].
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Model id to invoke.
    pub model: String,
    /// Max tokens the model may generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// System prompt (the five-stage optimization protocol instructions).
    pub system_prompt: String,
}

/// Query analysis extracted alongside the optimized query variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAnalysis {
    /// Original, unmodified query text.
    pub original: String,
    /// Detected language (e.g. `"en"`, `"zh"`).
    pub language: String,
    /// Doc-sets the LLM judged relevant.
    pub doc_set: Vec<String>,
    /// Nouns anchoring the query to its subject matter.
    pub domain_nouns: Vec<String>,
    /// Verbs describing the requested action.
    pub predicate_verbs: Vec<String>,
}

/// A single ranked, strategy-tagged query variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedQuery {
    /// Rewritten query text.
    pub query: String,
    /// Rank among the variants (1 = best).
    pub rank: u32,
    /// Which expansion strategy produced it (e.g. `"decomposition"`, `"synonym"`).
    pub strategy: String,
}

/// The full result of a [`optimize`] call.
#[derive(Debug, Clone, Default)]
pub struct OptimizationResult {
    /// Structured analysis of the original query.
    pub query_analysis: QueryAnalysis,
    /// Optimized query variants, ranked best-first.
    pub optimized_queries: Vec<OptimizedQuery>,
    /// Whether online fallback is suggested, with a reason (on parse failure).
    pub search_recommendation_reason: Option<String>,
    /// Extended-thinking trace, if the model emitted one.
    pub thinking: Option<String>,
    /// Raw response text, for debugging.
    pub raw_response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OptimizerPayload {
    #[serde(default)]
    query_analysis: QueryAnalysis,
    #[serde(default)]
    optimized_queries: Vec<OptimizedQuery>,
}

/// Run the query-optimization stage against `query`.
///
/// # Errors
///
/// Returns an error if the LLM call itself fails; a response that doesn't
/// parse as the expected JSON shape is reported via
/// `search_recommendation_reason`, not an `Err`, so a malformed upstream
/// response degrades gracefully instead of aborting the request.
pub async fn optimize(client: &dyn LlmClient, config: &OptimizerConfig, query: &str) -> crate::error::Result<OptimizationResult> {
    let response = client
        .invoke(
            &config.model,
            &config.system_prompt,
            &[LlmMessage::user(query)],
            config.max_tokens,
            config.temperature,
        )
        .await?;

    let raw_response = response.text();
    let thinking = response.thinking();

    let Some(raw) = raw_response.as_ref() else {
        return Ok(OptimizationResult {
            search_recommendation_reason: Some("empty LLM response".to_string()),
            thinking,
            raw_response,
            ..OptimizationResult::default()
        });
    };

    match extract_json_from_codeblock(raw).and_then(|v| serde_json::from_value::<OptimizerPayload>(v).ok()) {
        Some(payload) => Ok(OptimizationResult {
            query_analysis: payload.query_analysis,
            optimized_queries: payload.optimized_queries,
            search_recommendation_reason: None,
            thinking,
            raw_response,
        }),
        None => Ok(OptimizationResult {
            search_recommendation_reason: Some("failed to parse LLM response".to_string()),
            thinking,
            raw_response,
            ..OptimizationResult::default()
        }),
    }
}
