//! Stage-1 embedding reranking: `HeadingReranker` scores a single
//! page's headings against one query; `BatchReranker` is the hot path used
//! inside the Searcher, batching page titles and headings across every query
//! and doc-set into as few `Matcher` calls as possible.

use crate::config::RerankerConfig;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::text::preprocess;
use crate::types::{Heading, HeadingSource, ScoredPage};
use std::collections::HashSet;

/// Precision headings require `rerank_sim >= threshold + PRECISION_MARGIN`.
const PRECISION_MARGIN: f32 = 0.20;

/// Rerank a single page's headings against `query`, in isolation.
///
/// Sets `rerank_sim` and `source = Reranker` on every heading that was
/// scored, filters by `config.threshold`, keeps at most `config.top_k`, and
/// promotes survivors to `is_precision` when they clear the precision
/// margin above threshold.
///
/// # Errors
///
/// Returns an error if the matcher's encode call fails.
pub async fn rerank_headings(
    matcher: &dyn Matcher,
    query: &str,
    mut headings: Vec<Heading>,
    config: &RerankerConfig,
    domain_nouns: &[String],
    predicate_verbs: &[String],
    protected: &HashSet<String>,
) -> Result<Vec<Heading>> {
    if headings.is_empty() || !config.enabled {
        return Ok(headings);
    }

    let texts: Vec<String> = headings
        .iter()
        .map(|h| preprocess(&h.text, domain_nouns, predicate_verbs, protected))
        .collect();
    let scored = matcher.rerank(query, &texts).await?;
    let scores: Vec<f32> = scored
        .into_iter()
        .map(|(_, score)| score)
        .collect();

    for (heading, score) in headings.iter_mut().zip(scores.iter()) {
        heading.rerank_sim = Some(*score);
        heading.source = HeadingSource::Reranker;
        heading.is_basic = *score >= config.threshold;
        heading.is_precision = *score >= config.threshold + PRECISION_MARGIN;
    }

    headings.retain(|h| h.is_basic);
    headings.sort_by(|a, b| b.rerank_sim.unwrap_or(0.0).total_cmp(&a.rerank_sim.unwrap_or(0.0)));
    if config.top_k > 0 && headings.len() > config.top_k {
        headings.truncate(config.top_k);
    }
    Ok(headings)
}

/// Batch-rerank page titles and/or headings across every query at once
/// (`batch_rerank_pages_and_headings`).
///
/// `rerank_scopes` controls which batches run: `"page_title"` reranks every
/// page's title in one call (each page's `rerank_sim` becomes the max score
/// across queries), and, when that's the *only* scope configured, a page
/// whose score clears both the reranker threshold and the precision
/// threshold has its headings cleared — the page title alone is the answer.
/// `"headings"` reranks every surviving heading across every surviving page
/// in a second batched call.
///
/// # Errors
///
/// Returns an error if a matcher encode call fails.
pub async fn batch_rerank_pages_and_headings(
    matcher: &dyn Matcher,
    queries: &[String],
    mut pages: Vec<ScoredPage>,
    config: &RerankerConfig,
    rerank_scopes: &[String],
    domain_nouns: &[String],
    predicate_verbs: &[String],
    protected: &HashSet<String>,
) -> Result<Vec<ScoredPage>> {
    if pages.is_empty() || !config.enabled {
        return Ok(pages);
    }

    let scope_has = |name: &str| rerank_scopes.iter().any(|s| s == name);
    let title_only = rerank_scopes.len() == 1 && scope_has("page_title");

    if scope_has("page_title") {
        let titles: Vec<String> = pages
            .iter()
            .map(|p| preprocess(&p.page_title, domain_nouns, predicate_verbs, protected))
            .collect();
        let (matrix, _) = matcher.rerank_batch(queries, &titles).await?;

        for (page_idx, page) in pages.iter_mut().enumerate() {
            let max_score = matrix
                .iter()
                .map(|row| row[page_idx])
                .fold(f32::MIN, f32::max);
            page.rerank_sim = Some(max_score);
            page.is_basic = max_score >= config.threshold;
            page.is_precision = max_score >= config.threshold + PRECISION_MARGIN;
            if page.source != HeadingSource::Fallback2 {
                page.source = HeadingSource::Reranker;
            }

            if title_only && page.is_basic && page.is_precision {
                page.headings.clear();
                page.recompute_counts();
            }
        }
    }

    if scope_has("headings") {
        let mut flat_texts = Vec::new();
        let mut locations = Vec::new();
        for (page_idx, page) in pages.iter().enumerate() {
            for (heading_idx, heading) in page.headings.iter().enumerate() {
                flat_texts.push(preprocess(&heading.text, domain_nouns, predicate_verbs, protected));
                locations.push((page_idx, heading_idx));
            }
        }

        if !flat_texts.is_empty() {
            let (matrix, _) = matcher.rerank_batch(queries, &flat_texts).await?;
            let mut max_scores = vec![f32::MIN; flat_texts.len()];
            for row in &matrix {
                for (flat_idx, score) in row.iter().enumerate() {
                    if *score > max_scores[flat_idx] {
                        max_scores[flat_idx] = *score;
                    }
                }
            }

            for ((page_idx, heading_idx), score) in locations.into_iter().zip(max_scores.into_iter()) {
                let heading = &mut pages[page_idx].headings[heading_idx];
                heading.rerank_sim = Some(score);
                heading.source = HeadingSource::Reranker;
                heading.is_basic = score >= config.threshold;
                heading.is_precision = score >= config.threshold + PRECISION_MARGIN;
            }

            for page in &mut pages {
                page.headings.retain(|h| h.is_basic);
                page.recompute_counts();
            }
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeadingSource;
    use async_trait::async_trait;

    struct StubMatcher;

    #[async_trait]
    impl Matcher for StubMatcher {
        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![if t.contains("install") { 1.0 } else { 0.1 }, 0.0])
                .collect())
        }
    }

    fn heading(text: &str) -> Heading {
        Heading {
            text: text.to_string(),
            level: 2,
            bm25_sim: None,
            rerank_sim: None,
            is_basic: false,
            is_precision: false,
            source: HeadingSource::Bm25,
            related_context: None,
        }
    }

    fn page(title: &str, headings: Vec<Heading>) -> ScoredPage {
        let mut p = ScoredPage {
            doc_set: "Docs@1.0".to_string(),
            page_title: title.to_string(),
            toc_path: std::path::PathBuf::from("docTOC.md"),
            headings,
            heading_count: 0,
            precision_count: 0,
            bm25_sim: None,
            rerank_sim: None,
            is_basic: false,
            is_precision: false,
            source: HeadingSource::Bm25,
        };
        p.recompute_counts();
        p
    }

    #[tokio::test]
    async fn rerank_headings_filters_by_threshold() {
        let matcher = StubMatcher;
        let config = RerankerConfig { threshold: 0.5, top_k: 10, ..RerankerConfig::default() };
        let headings = vec![heading("install guide"), heading("unrelated topic")];
        let result = rerank_headings(&matcher, "install", headings, &config, &[], &[], &HashSet::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "install guide");
        assert!(result[0].is_basic);
    }

    #[tokio::test]
    async fn rerank_headings_disabled_passes_through() {
        let matcher = StubMatcher;
        let config = RerankerConfig { enabled: false, ..RerankerConfig::default() };
        let headings = vec![heading("a"), heading("b")];
        let result = rerank_headings(&matcher, "q", headings, &config, &[], &[], &HashSet::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn batch_rerank_clears_headings_when_page_title_only_scope_precise() {
        let matcher = StubMatcher;
        let config = RerankerConfig { threshold: 0.5, ..RerankerConfig::default() };
        let pages = vec![page("install guide", vec![heading("step one")])];
        let queries = vec!["install".to_string()];
        let result = batch_rerank_pages_and_headings(
            &matcher,
            &queries,
            pages,
            &config,
            &["page_title".to_string()],
            &[],
            &[],
            &HashSet::new(),
        )
        .await
        .unwrap();
        assert!(result[0].is_precision);
        assert!(result[0].headings.is_empty());
    }

    #[tokio::test]
    async fn batch_rerank_headings_scope_filters_low_scores() {
        let matcher = StubMatcher;
        let config = RerankerConfig { threshold: 0.5, ..RerankerConfig::default() };
        let pages = vec![page("guide", vec![heading("install steps"), heading("unrelated")])];
        let queries = vec!["install".to_string()];
        let result = batch_rerank_pages_and_headings(
            &matcher,
            &queries,
            pages,
            &config,
            &["headings".to_string()],
            &[],
            &[],
            &HashSet::new(),
        )
        .await
        .unwrap();
        assert_eq!(result[0].headings.len(), 1);
        assert_eq!(result[0].headings[0].text, "install steps");
    }
}
