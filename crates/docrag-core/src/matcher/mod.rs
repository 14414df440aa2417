//! The `Matcher` abstraction: a pluggable embedding backend used by stage-1
//! reranking.
//!
//! Three backends implement this trait: [`hf::HfMatcher`] (remote Hugging
//! Face Inference API), [`modelscope::ModelScopeMatcher`] (remote
//! ModelScope OpenAI-compatible endpoint), and [`local::LocalMatcher`] (a
//! local sentence-transformer server, used for the fallback-2 local rerank
//! pass so it works without external API keys).

pub mod hf;
pub mod local;
pub mod modelscope;

use crate::config::EmbeddingProvider;
use crate::error::Result;
use crate::text::cjk_ratio;
use async_trait::async_trait;

/// An embedding/reranking backend.
///
/// The two higher-level methods have default implementations built on top of
/// [`Matcher::encode`], so a backend only has to implement the HTTP/model
/// call; cosine similarity and sorting are shared.
#[async_trait]
pub trait Matcher: Send + Sync {
    /// Encode a batch of texts into embedding vectors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Matcher`] if the backend call fails.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Rerank `candidates` against a single `query`, returning
    /// `(candidate, score)` pairs sorted by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Matcher`] if encoding fails.
    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<(String, f32)>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = vec![query.to_string()];
        batch.extend_from_slice(candidates);
        let embeddings = self.encode(&batch).await?;
        let query_vec = &embeddings[0];

        let mut scored: Vec<(String, f32)> = candidates
            .iter()
            .zip(embeddings.iter().skip(1))
            .map(|(text, vec)| (text.clone(), cosine_similarity(query_vec, vec)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored)
    }

    /// Rerank `candidates` against every query in `queries` in one batched
    /// embedding call, returning the similarity matrix (`[queries][candidates]`)
    /// alongside the candidates it was computed over.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Matcher`] if encoding fails.
    async fn rerank_batch(
        &self,
        queries: &[String],
        candidates: &[String],
    ) -> Result<(Vec<Vec<f32>>, Vec<String>)> {
        if queries.is_empty() || candidates.is_empty() {
            return Ok((Vec::new(), candidates.to_vec()));
        }
        let mut batch = queries.to_vec();
        batch.extend_from_slice(candidates);
        let embeddings = self.encode(&batch).await?;
        let query_vecs = &embeddings[..queries.len()];
        let candidate_vecs = &embeddings[queries.len()..];

        let matrix = query_vecs
            .iter()
            .map(|qv| candidate_vecs.iter().map(|cv| cosine_similarity(qv, cv)).collect())
            .collect();
        Ok((matrix, candidates.to_vec()))
    }
}

/// Cosine similarity via L2-normalized dot product.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Choose between a Chinese and an English model id based on the aggregate
/// CJK character ratio across every input text (≥90% CJK → use
/// the Chinese model).
#[must_use]
pub fn select_model<'a>(model_zh: &'a str, model_en: &'a str, texts: &[String], lang_threshold: f64) -> &'a str {
    let aggregate: String = texts.join(" ");
    if cjk_ratio(&aggregate) >= lang_threshold {
        model_zh
    } else {
        model_en
    }
}

/// Construct the configured remote [`Matcher`] backend.
///
/// # Errors
///
/// Returns [`crate::error::Error::Config`] if required environment
/// variables (API keys) are missing for the selected provider.
pub fn build_remote_matcher(
    provider: EmbeddingProvider,
    model_zh: &str,
    model_en: &str,
    lang_threshold: f64,
) -> Result<Box<dyn Matcher>> {
    match provider {
        EmbeddingProvider::Hf => Ok(Box::new(hf::HfMatcher::from_env(
            model_zh.to_string(),
            model_en.to_string(),
            lang_threshold,
        )?)),
        EmbeddingProvider::Ms => Ok(Box::new(modelscope::ModelScopeMatcher::from_env(
            model_zh.to_string(),
            model_en.to_string(),
            lang_threshold,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn select_model_picks_chinese_above_threshold() {
        let texts = vec!["如何创建一个技能文件".to_string()];
        assert_eq!(select_model("zh-model", "en-model", &texts, 0.90), "zh-model");
    }

    #[test]
    fn select_model_picks_english_for_mixed_technical_text() {
        let texts = vec!["npm install react and configure webpack 安装".to_string()];
        assert_eq!(select_model("zh-model", "en-model", &texts, 0.90), "en-model");
    }
}
