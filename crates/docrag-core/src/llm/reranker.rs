//! LLMReranker: ask an LLM to score each
//! `(query, page_title, heading)` tuple, fill missing `rerank_sim`, then
//! apply a *recoverable* threshold — one that lowers itself rather than
//! emptying the result outright.
//!
//! [`adjust_threshold`] and [`filter_reranker_output`] are kept as
//! standalone functions (mirroring `reranker_utils.py`'s separation from the
//! orchestrator) so the threshold-recovery behavior is independently
//! testable from the LLM call itself.

use crate::error::Result;
use crate::llm::json_extract::extract_json_from_codeblock;
use crate::llm::{LlmClient, LlmMessage};
use crate::types::{HeadingSource, ScoredPage, SearchResult};
use serde::Deserialize;

/// Configuration for [`rerank`].
#[derive(Debug, Clone)]
pub struct LlmRerankerConfig {
    /// Model id to invoke.
    pub model: String,
    /// Max tokens the model may generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// System prompt (scoring instructions).
    pub system_prompt: String,
    /// Original (pre-relaxation) threshold to filter by.
    pub threshold: f32,
    /// Amount to lower the threshold by if it empties the result.
    pub threshold_adjustment: f32,
    /// Minimum survivors guaranteed after relaxation.
    pub min_headings_count: usize,
}

/// Result of an [`rerank`] call.
#[derive(Debug, Clone)]
pub struct RerankerResult {
    /// Re-scored, filtered pages.
    pub data: Vec<ScoredPage>,
    /// Total heading count before LLM rescoring/filtering.
    pub total_headings_before: usize,
    /// Total heading count after filtering.
    pub total_headings_after: usize,
    /// Extended-thinking trace, if the model emitted one.
    pub thinking: Option<String>,
    /// Raw response text, for debugging.
    pub raw_response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmScorePayload {
    #[serde(default)]
    scores: Vec<LlmHeadingScore>,
}

#[derive(Debug, Deserialize)]
struct LlmHeadingScore {
    page_title: String,
    heading_text: String,
    rerank_sim: f32,
}

/// Lower `threshold` by `adjustment`, floored at `0.0` and rounded to two
/// decimal places.
#[must_use]
pub fn adjust_threshold(threshold: f32, adjustment: f32) -> f32 {
    let adjusted = (threshold - adjustment).max(0.0);
    (adjusted * 100.0).round() / 100.0
}

/// Re-filter `pages` by `threshold`, applying the four-rule policy from
/// `reranker_utils.filter_reranker_output`:
///
/// 1. A page whose own `rerank_sim >= threshold` survives with its headings
///    cleared (the page title alone is the answer).
/// 2. Otherwise, keep only headings with `rerank_sim >= threshold`; drop the
///    page if none remain.
/// 3. If the result is empty but some heading anywhere scored below
///    threshold, keep the single highest-scoring heading (on its page) so
///    the caller never gets back nothing — a minimum-retention guard,
///    applied by [`rerank`] after relaxing the threshold once.
#[must_use]
pub fn filter_reranker_output(pages: &[ScoredPage], threshold: f32) -> Vec<ScoredPage> {
    let mut filtered = Vec::new();

    for page in pages {
        if page.rerank_sim.is_some_and(|s| s >= threshold) {
            let mut cleared = page.clone();
            cleared.headings.clear();
            cleared.recompute_counts();
            filtered.push(cleared);
            continue;
        }

        let kept_headings: Vec<_> = page
            .headings
            .iter()
            .filter(|h| h.rerank_sim.is_some_and(|s| s >= threshold))
            .cloned()
            .collect();
        if !kept_headings.is_empty() {
            let mut kept_page = page.clone();
            kept_page.headings = kept_headings;
            kept_page.recompute_counts();
            filtered.push(kept_page);
        }
    }

    filtered
}

/// Guarantee at least `min_headings_count` survivors: if `filtered` is
/// empty, take the single best-scoring heading from `original` (searching
/// across all pages) and return a one-page, one-heading result built around it.
fn apply_minimum_retention(original: &[ScoredPage], filtered: Vec<ScoredPage>, min_headings_count: usize) -> Vec<ScoredPage> {
    let total_kept: usize = filtered.iter().map(|p| p.headings.len().max(1)).sum();
    if total_kept >= min_headings_count || min_headings_count == 0 {
        return filtered;
    }

    let mut best: Option<(&ScoredPage, usize, f32)> = None;
    for page in original {
        for (idx, heading) in page.headings.iter().enumerate() {
            let Some(score) = heading.rerank_sim else { continue };
            if best.is_none_or(|(_, _, best_score)| score > best_score) {
                best = Some((page, idx, score));
            }
        }
    }

    let Some((page, heading_idx, _)) = best else {
        return filtered;
    };

    let mut result = filtered;
    let mut top_page = page.clone();
    top_page.headings = vec![page.headings[heading_idx].clone()];
    top_page.recompute_counts();
    if !result.iter().any(|p| p.key() == top_page.key()) {
        result.push(top_page);
    }
    result
}

/// Run the LLM reranker stage over `result`, re-scoring every heading and
/// applying the recoverable threshold described in the module docs.
///
/// # Errors
///
/// Returns an error if the underlying LLM call fails.
pub async fn rerank(client: &dyn LlmClient, config: &LlmRerankerConfig, result: &SearchResult) -> Result<RerankerResult> {
    let total_headings_before: usize = result.results.iter().map(|p| p.headings.len()).sum();

    let prompt = build_scoring_prompt(&result.query, &result.results);
    let response = client
        .invoke(
            &config.model,
            &config.system_prompt,
            &[LlmMessage::user(prompt)],
            config.max_tokens,
            config.temperature,
        )
        .await?;

    let raw_response = response.text();
    let thinking = response.thinking();
    let scores = raw_response
        .as_deref()
        .and_then(extract_json_from_codeblock)
        .and_then(|v| serde_json::from_value::<LlmScorePayload>(v).ok())
        .map(|p| p.scores)
        .unwrap_or_default();

    let mut scored_pages = result.results.clone();
    for page in &mut scored_pages {
        for heading in &mut page.headings {
            if let Some(score) = scores
                .iter()
                .find(|s| s.page_title == page.page_title && s.heading_text == heading.text)
            {
                heading.rerank_sim = Some(score.rerank_sim);
                heading.source = HeadingSource::LlmReranker;
            }
        }
        page.rerank_sim = page.headings.iter().filter_map(|h| h.rerank_sim).fold(None, |acc, s| {
            Some(acc.map_or(s, |a: f32| a.max(s)))
        });
    }

    let mut filtered = filter_reranker_output(&scored_pages, config.threshold);
    if filtered.is_empty() {
        let relaxed = adjust_threshold(config.threshold, config.threshold_adjustment);
        filtered = filter_reranker_output(&scored_pages, relaxed);
    }
    filtered = apply_minimum_retention(&scored_pages, filtered, config.min_headings_count);

    let total_headings_after: usize = filtered.iter().map(|p| p.headings.len().max(1)).sum();

    Ok(RerankerResult {
        data: filtered,
        total_headings_before,
        total_headings_after,
        thinking,
        raw_response,
    })
}

fn build_scoring_prompt(queries: &[String], pages: &[ScoredPage]) -> String {
    let mut prompt = format!("Query: {}\n\nScore each heading's relevance on [0,1]:\n", queries.join(" "));
    for page in pages {
        for heading in &page.headings {
            prompt.push_str(&format!("- page_title: {}, heading: {}\n", page.page_title, heading.text));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Heading, HeadingSource as HS};

    fn heading(text: &str, rerank_sim: Option<f32>) -> Heading {
        Heading {
            text: text.to_string(),
            level: 2,
            bm25_sim: None,
            rerank_sim,
            is_basic: false,
            is_precision: false,
            source: HS::Bm25,
            related_context: None,
        }
    }

    fn page(title: &str, rerank_sim: Option<f32>, headings: Vec<Heading>) -> ScoredPage {
        let mut p = ScoredPage {
            doc_set: "Docs@1.0".to_string(),
            page_title: title.to_string(),
            toc_path: std::path::PathBuf::new(),
            headings,
            heading_count: 0,
            precision_count: 0,
            bm25_sim: None,
            rerank_sim,
            is_basic: false,
            is_precision: false,
            source: HS::Bm25,
        };
        p.recompute_counts();
        p
    }

    #[test]
    fn adjust_threshold_lowers_and_floors_at_zero() {
        assert_eq!(adjust_threshold(0.68, 0.1), 0.58);
        assert_eq!(adjust_threshold(0.05, 0.1), 0.0);
    }

    #[test]
    fn adjust_threshold_rounds_to_two_decimals() {
        assert_eq!(adjust_threshold(0.683, 0.103), 0.58);
    }

    #[test]
    fn page_level_pass_clears_headings() {
        let pages = vec![page("Install Guide", Some(0.9), vec![heading("step one", Some(0.2))])];
        let filtered = filter_reranker_output(&pages, 0.68);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].headings.is_empty());
    }

    #[test]
    fn heading_level_filter_drops_low_scores() {
        let pages = vec![page(
            "Guide",
            Some(0.3),
            vec![heading("good match", Some(0.8)), heading("bad match", Some(0.1))],
        )];
        let filtered = filter_reranker_output(&pages, 0.68);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].headings.len(), 1);
        assert_eq!(filtered[0].headings[0].text, "good match");
    }

    #[test]
    fn page_with_no_survivors_is_dropped() {
        let pages = vec![page("Guide", Some(0.1), vec![heading("low", Some(0.05))])];
        let filtered = filter_reranker_output(&pages, 0.68);
        assert!(filtered.is_empty());
    }

    #[test]
    fn minimum_retention_keeps_best_heading_when_empty() {
        let original = vec![page("Guide", Some(0.1), vec![heading("best", Some(0.5)), heading("worse", Some(0.2))])];
        let filtered = apply_minimum_retention(&original, Vec::new(), 1);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].headings.len(), 1);
        assert_eq!(filtered[0].headings[0].text, "best");
    }
}
