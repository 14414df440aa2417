//! Configuration for the docrag search pipeline.
//!
//! `SearchConfig` is the single TOML/JSON-backed configuration object threaded
//! through every search-path module: [`SearchConfig::load`] accepts a file
//! path or an inline JSON object, [`SearchConfig::merge_with_defaults`] deep
//! merges a partial user config over the defaults, and [`SearchConfig::validate`]
//! returns every out-of-range field as a human-readable message rather than
//! panicking.
//!
//! ## Example
//!
//! ```rust
//! use docrag_core::SearchConfig;
//!
//! let config = SearchConfig::default();
//! assert!(config.validate().is_empty());
//! assert_eq!(config.bm25.k1, 1.2);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// BM25 lexical scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term-frequency saturation parameter, valid range `[0.0, 5.0]`.
    pub k1: f32,
    /// Length-normalization parameter, valid range `[0.0, 1.0]`.
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Score thresholds applied after BM25 recall and after reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Minimum page-level BM25 score to keep a page on title match alone.
    pub page_title: f32,
    /// Minimum score for a heading to be considered a basic match (`is_basic`).
    pub headings: f32,
    /// Minimum score for a heading to be considered a precision match (`is_precision`).
    pub precision: f32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            page_title: 0.60,
            headings: 0.25,
            precision: 0.70,
        }
    }
}

/// Which embedding backend the embedding [`crate::matcher::Matcher`] should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hugging Face Inference API.
    Hf,
    /// ModelScope's OpenAI-compatible endpoint.
    Ms,
}

/// Stage-1 embedding reranker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Whether embedding reranking runs at all.
    pub enabled: bool,
    /// Model id used when the query/corpus is detected as Chinese.
    pub model_zh: String,
    /// Model id used otherwise.
    pub model_en: String,
    /// Minimum similarity score to keep a heading (see [`ThresholdsConfig`]
    /// for the BM25-stage equivalents; this one gates post-rerank survival).
    pub threshold: f32,
    /// Cap on reranked headings returned per page.
    pub top_k: usize,
    /// CJK character ratio above which a query/corpus is treated as Chinese.
    pub lang_threshold: f32,
    /// Which remote API serves the embedding calls.
    pub embedding_provider: EmbeddingProvider,
    /// Explicit model id override, bypassing `model_zh`/`model_en` selection.
    pub embedding_model_id: Option<String>,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_zh: "BAAI/bge-reranker-v2-m3".to_string(),
            model_en: "BAAI/bge-reranker-v2-m3".to_string(),
            threshold: 0.68,
            top_k: 10,
            lang_threshold: 0.90,
            embedding_provider: EmbeddingProvider::Hf,
            embedding_model_id: None,
        }
    }
}

/// Which fallback strategies run, and how, when BM25 recall is thin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Run FALLBACK_1, then FALLBACK_2 only if still thin.
    Serial,
    /// Run FALLBACK_1 and FALLBACK_2 together, merge, rerank once.
    Parallel,
}

/// Fallback-search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Execution strategy for the two fallback passes.
    pub mode: FallbackMode,
    /// Whether a secondary local-embedding rerank narrows FALLBACK_2 hits by ratio.
    pub fallback_2_local_rerank: bool,
    /// Fraction of FALLBACK_2 hits kept by the local rerank, by descending similarity.
    pub fallback_2_local_rerank_ratio: f32,
    /// Device string passed to the local sentence-transformer backend (`"cpu"`, `"cuda"`, ...).
    pub local_device: String,
    /// Local model id used for Chinese content.
    pub local_model_zh: String,
    /// Local model id used for non-Chinese content.
    pub local_model_en: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            mode: FallbackMode::Parallel,
            fallback_2_local_rerank: false,
            fallback_2_local_rerank_ratio: 0.6,
            local_device: "cpu".to_string(),
            local_model_zh: "BAAI/bge-small-zh-v1.5".to_string(),
            local_model_en: "BAAI/bge-small-en-v1.5".to_string(),
        }
    }
}

/// FALLBACK_2 (content regex search) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSearchConfig {
    /// Global cap on FALLBACK_2 matches scanned across the whole corpus.
    pub max_results: usize,
    /// Lines of context kept on each side of a matched line.
    pub context_lines: usize,
}

impl Default for ContentSearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            context_lines: 3,
        }
    }
}

/// Stage-1.5 LLM reranker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmRerankerConfig {
    /// Whether the LLM reranker stage runs at all.
    pub enabled: bool,
    /// Minimum survivors guaranteed after the recoverable-threshold re-filter.
    pub min_headings_count: usize,
    /// Amount the threshold is lowered by when the first filter pass empties the result.
    pub threshold_adjustment: f32,
}

impl Default for LlmRerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_headings_count: 1,
            threshold_adjustment: 0.1,
        }
    }
}

/// Root search configuration, threaded through every pipeline stage.
///
/// `validate()` checks the ranges a loaded config must satisfy, and
/// `merge_with_defaults` lets a partial user-supplied JSON object override
/// only the fields it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// BM25 scoring parameters.
    pub bm25: Bm25Config,
    /// Score thresholds for basic/precision/page-title matches.
    pub thresholds: ThresholdsConfig,
    /// Embedding reranker (stage 1) configuration.
    pub reranker: RerankerConfig,
    /// Fallback-search (FALLBACK_1/FALLBACK_2) configuration.
    pub fallback: FallbackConfig,
    /// FALLBACK_2 content-search configuration.
    pub content_search: ContentSearchConfig,
    /// LLM reranker (stage 1.5) configuration.
    pub llm_reranker: LlmRerankerConfig,
    /// Which text fields participate in embedding rerank.
    pub rerank_scopes: Vec<String>,
    /// Custom path to `skiped_keywords.txt`, overriding the built-in search order.
    pub skiped_keywords_path: Option<PathBuf>,
    /// Minimum number of pages a `SearchResult` must contain to count as successful.
    pub min_page_titles: usize,
    /// Minimum number of `is_basic` headings a doc-set needs to keep a page on
    /// heading coverage alone (see [`ThresholdsConfig::page_title`]).
    pub min_headings: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Config::default(),
            thresholds: ThresholdsConfig::default(),
            reranker: RerankerConfig::default(),
            fallback: FallbackConfig::default(),
            content_search: ContentSearchConfig::default(),
            llm_reranker: LlmRerankerConfig::default(),
            rerank_scopes: vec!["page_title".to_string(), "headings".to_string()],
            skiped_keywords_path: None,
            min_page_titles: 2,
            min_headings: 2,
        }
    }
}

impl SearchConfig {
    /// Load a configuration from a file path or an inline JSON object.
    ///
    /// A string that (once trimmed) starts with `{` is parsed as JSON
    /// directly; otherwise it is treated as a path to a JSON or TOML file,
    /// selected by extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path doesn't exist, or [`Error::Serialization`]
    /// if the content can't be parsed.
    pub fn load(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.starts_with('{') {
            return Ok(serde_json::from_str(trimmed)?);
        }

        let path = PathBuf::from(trimmed);
        if !path.exists() {
            return Err(Error::Config(format!("Config file not found: {source}")));
        }
        let content = std::fs::read_to_string(&path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Ok(serde_json::from_str(&content)?),
        }
    }

    /// Deep-merge a partial user configuration (as JSON) over this config's
    /// current values, returning the merged result.
    ///
    /// Mirrors `ConfigManager.merge_with_defaults`: only the keys present in
    /// `user_config` are overridden, nested objects merge recursively, and
    /// arrays/scalars are replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `self` or the merged value can't
    /// round-trip through `serde_json`.
    pub fn merge_with_defaults(&self, user_config: &serde_json::Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        Self::deep_merge(&mut base, user_config);
        Ok(serde_json::from_value(base)?)
    }

    fn deep_merge(base: &mut serde_json::Value, overlay: &serde_json::Value) {
        let (Some(base_obj), Some(overlay_obj)) = (base.as_object_mut(), overlay.as_object())
        else {
            *base = overlay.clone();
            return;
        };
        for (key, value) in overlay_obj {
            match base_obj.get_mut(key) {
                Some(existing) if existing.is_object() && value.is_object() => {
                    Self::deep_merge(existing, value);
                },
                _ => {
                    base_obj.insert(key.clone(), value.clone());
                },
            }
        }
    }

    /// Validate every range-constrained field, returning one message per
    /// violation. An empty list means the configuration is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(0.0..=5.0).contains(&self.bm25.k1) {
            errors.push(format!("BM25 k1 must be between 0.0 and 5.0, got {}", self.bm25.k1));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            errors.push(format!("BM25 b must be between 0.0 and 1.0, got {}", self.bm25.b));
        }
        if !(0.0..=1.0).contains(&self.thresholds.page_title) {
            errors.push(format!(
                "threshold_page_title must be between 0.0 and 1.0, got {}",
                self.thresholds.page_title
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.headings) {
            errors.push(format!(
                "threshold_headings must be between 0.0 and 1.0, got {}",
                self.thresholds.headings
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.precision) {
            errors.push(format!(
                "threshold_precision must be between 0.0 and 1.0, got {}",
                self.thresholds.precision
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback.fallback_2_local_rerank_ratio) {
            errors.push(format!(
                "fallback_2_local_rerank_ratio must be between 0.0 and 1.0, got {}",
                self.fallback.fallback_2_local_rerank_ratio
            ));
        }
        let valid_scopes = ["page_title", "headings"];
        for scope in &self.rerank_scopes {
            if !valid_scopes.contains(&scope.as_str()) {
                errors.push(format!(
                    "Invalid rerank_scopes entry: '{scope}'. Must be one of {valid_scopes:?}"
                ));
            }
        }
        if self.min_page_titles < 1 {
            errors.push("min_page_titles must be at least 1".to_string());
        }
        if self.min_headings < 1 {
            errors.push("min_headings must be at least 1".to_string());
        }

        errors
    }
}
