//! Searcher orchestration: from a `(queries, target_doc_sets)`
//! pair, produce a [`SearchResult`] by running BM25 recall and the two
//! fallback strategies per doc-set, merging their pages into one candidate
//! set, then reranking and filtering that merged set in a single pass.

use crate::bm25::{self, RecallParams};
use crate::config::{FallbackMode, SearchConfig};
use crate::corpus::{discover_doc_sets, discover_pages};
use crate::error::Result;
use crate::fallback1;
use crate::content_search;
use crate::language::check_language_consistency;
use crate::matcher::Matcher;
use crate::reranker::batch_rerank_pages_and_headings;
use crate::text::{protected_keywords, tokenize};
use crate::types::{Diagnostic, FallbackUsed, Heading, HeadingSource, ScoredPage, SearchResult};
use std::collections::HashMap;

/// Everything the Searcher needs beyond the raw config: values that stage 0a
/// (`QueryOptimizer`) would normally supply.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Query variants to search with.
    pub queries: Vec<String>,
    /// Doc-sets to restrict the search to; empty means "all discovered".
    pub target_doc_sets: Vec<String>,
    /// Nouns anchoring a query to its subject matter.
    pub domain_nouns: Vec<String>,
    /// Verbs stripped from rerank candidates that lack an anchoring noun.
    pub predicate_verbs: Vec<String>,
    /// Keywords stripped from every query before searching (step 1).
    pub skiped_keywords: Vec<String>,
}

/// Run the full Searcher flow against `base_dir` for `request`.
///
/// # Errors
///
/// Returns an error for I/O failures during corpus discovery; a language
/// mismatch or empty-query condition is reported in the returned
/// `SearchResult` (`success = false`) rather than as an `Err`.
pub async fn search(
    base_dir: &std::path::Path,
    request: &SearchRequest,
    config: &SearchConfig,
    matcher: Option<&dyn Matcher>,
) -> Result<SearchResult> {
    let mut diagnostics = Vec::new();

    // Step 1: query rewriting by skiped_keywords.
    let protected = protected_keywords(&request.skiped_keywords, &request.domain_nouns);
    let unprotected_skips: Vec<&String> = request
        .skiped_keywords
        .iter()
        .filter(|k| !protected.contains(k.as_str()))
        .collect();
    let rewritten_queries: Vec<String> = request
        .queries
        .iter()
        .map(|q| rewrite_query(q, &unprotected_skips))
        .filter(|q| !q.is_empty())
        .collect();

    if rewritten_queries.is_empty() {
        return Ok(empty_result(
            rewritten_queries,
            "all queries were empty after removing skiped keywords".to_string(),
        ));
    }

    // Step 2: doc-set discovery and intersection.
    let discovered = discover_doc_sets(base_dir)?;
    let selected: Vec<_> = if request.target_doc_sets.is_empty() {
        discovered
    } else {
        discovered
            .into_iter()
            .filter(|d| request.target_doc_sets.contains(&d.name))
            .collect()
    };

    if selected.is_empty() {
        return Ok(empty_result(rewritten_queries, "no matching doc-sets found under base_dir".to_string()));
    }

    let combined_query = rewritten_queries.join(" ");
    let mut all_pages: Vec<ScoredPage> = Vec::new();
    let mut fallback1_used = false;
    let mut fallback2_used = false;
    let mut doc_sets_found = Vec::new();

    for doc_set in &selected {
        let pages = discover_pages(doc_set)?;

        // Step 3: language consistency guard. Fatal — propagate immediately.
        if let Err(err) = check_language_consistency(&doc_set.name, &pages, &combined_query) {
            return Err(err);
        }

        doc_sets_found.push(doc_set.name.clone());

        let recall_params = RecallParams {
            k1: config.bm25.k1,
            b: config.bm25.b,
            threshold_headings: config.thresholds.headings,
            threshold_precision: config.thresholds.precision,
            threshold_page_title: config.thresholds.page_title,
            min_headings: config.min_headings,
        };
        let bm25_pages = bm25::recall(&doc_set.name, &pages, &rewritten_queries, recall_params)?;

        let fallback_pages = run_fallbacks(
            doc_set.path.as_path(),
            &doc_set.name,
            &pages,
            &rewritten_queries,
            &request.domain_nouns,
            config,
            &mut fallback1_used,
            &mut fallback2_used,
        )?;

        let mut merged = merge_pages(bm25_pages, fallback_pages);

        if let Some(matcher) = matcher {
            if config.reranker.enabled {
                merged = batch_rerank_pages_and_headings(
                    matcher,
                    &rewritten_queries,
                    merged,
                    &config.reranker,
                    &config.rerank_scopes,
                    &request.domain_nouns,
                    &request.predicate_verbs,
                    &protected,
                )
                .await?;
                for page in &mut merged {
                    page.headings.retain(|h| h.is_basic);
                    page.recompute_counts();
                }
            }
        }

        all_pages.extend(merged);
    }

    // Step 6: hierarchical filter per page (skipped for FALLBACK_2-sourced pages).
    for page in &mut all_pages {
        if page.source == HeadingSource::Fallback2 {
            continue;
        }
        hierarchical_filter(page);
    }

    // Step 7: final page-level gating.
    all_pages.retain(|p| {
        let has_heading = !p.headings.is_empty();
        let passes_title_threshold = p.bm25_sim.unwrap_or(0.0) >= config.thresholds.page_title;
        if has_heading {
            p.source == HeadingSource::Fallback2 || passes_title_threshold
        } else {
            passes_title_threshold
        }
    });

    let success = all_pages.len() >= config.min_page_titles;
    let fallback_used = match (fallback1_used, fallback2_used) {
        (true, true) => Some(FallbackUsed::Both),
        (true, false) => Some(FallbackUsed::Fallback1),
        (false, true) => Some(FallbackUsed::Fallback2),
        (false, false) => None,
    };

    if !success {
        diagnostics.push(Diagnostic::warn(
            doc_sets_found.join(","),
            format!(
                "only {} page(s) found, below min_page_titles={}",
                all_pages.len(),
                config.min_page_titles
            ),
        ));
    }

    Ok(SearchResult {
        success,
        query: rewritten_queries,
        doc_sets_found,
        results: all_pages,
        fallback_used,
        message: if success { None } else { Some("insufficient results".to_string()) },
        diagnostics,
    })
}

fn rewrite_query(query: &str, unprotected_skips: &[&String]) -> String {
    if unprotected_skips.is_empty() {
        return query.trim().to_string();
    }
    let skip_set: std::collections::HashSet<String> = unprotected_skips.iter().map(|s| s.to_lowercase()).collect();
    let kept: Vec<&str> = query
        .split_whitespace()
        .filter(|tok| !skip_set.contains(&tok.to_lowercase()))
        .collect();
    kept.join(" ")
}

fn empty_result(queries: Vec<String>, message: String) -> SearchResult {
    SearchResult {
        success: false,
        query: queries,
        doc_sets_found: Vec::new(),
        results: Vec::new(),
        fallback_used: None,
        message: Some(message),
        diagnostics: Vec::new(),
    }
}

/// Run both fallback strategies per `config.fallback.mode` and return their
/// merged, not-yet-reranked pages. The caller merges this with the BM25
/// recall set and reranks the combined set in a single pass, so a page
/// found by more than one strategy is only ever scored once.
#[allow(clippy::too_many_arguments)]
fn run_fallbacks(
    doc_set_path: &std::path::Path,
    doc_set_name: &str,
    pages: &[crate::types::Page],
    queries: &[String],
    domain_nouns: &[String],
    config: &SearchConfig,
    fallback1_used: &mut bool,
    fallback2_used: &mut bool,
) -> Result<Vec<ScoredPage>> {
    if domain_nouns.is_empty() {
        return Ok(Vec::new());
    }
    let combined_query = queries.join(" ");

    let run_fallback1 = || -> Result<Vec<ScoredPage>> {
        let doc_set = crate::types::DocSet { name: doc_set_name.to_string(), path: doc_set_path.to_path_buf() };
        let hits = fallback1::search(&doc_set, pages, domain_nouns)?;
        Ok(fallback1_hits_to_pages(doc_set_name, hits, &combined_query, config))
    };
    let run_fallback2 = || -> Result<Vec<ScoredPage>> {
        let hits = content_search::search(pages, domain_nouns, config.content_search.max_results)?;
        Ok(fallback2_hits_to_pages(doc_set_name, hits, &combined_query, config))
    };

    let merged = match config.fallback.mode {
        FallbackMode::Parallel => {
            let f1 = run_fallback1()?;
            let f2 = run_fallback2()?;
            *fallback1_used |= !f1.is_empty();
            *fallback2_used |= !f2.is_empty();
            merge_pages(f1, f2)
        },
        FallbackMode::Serial => {
            let f1 = run_fallback1()?;
            *fallback1_used |= !f1.is_empty();
            if !f1.is_empty() {
                f1
            } else {
                let f2 = run_fallback2()?;
                *fallback2_used |= !f2.is_empty();
                f2
            }
        },
    };

    Ok(merged)
}

fn fallback1_hits_to_pages(
    doc_set_name: &str,
    hits: Vec<(crate::types::Page, fallback1::Fallback1Hit)>,
    combined_query: &str,
    config: &SearchConfig,
) -> Vec<ScoredPage> {
    let mut by_page: HashMap<String, ScoredPage> = HashMap::new();
    let texts: Vec<String> = hits.iter().map(|(_, h)| h.heading_text.clone()).collect();
    let corpus = crate::bm25::Bm25Corpus::from_texts(&texts);

    for (idx, (page, hit)) in hits.into_iter().enumerate() {
        let score = corpus.score(combined_query, idx, config.bm25.k1, config.bm25.b);
        let heading = Heading {
            text: hit.heading_text,
            level: hit.heading_level,
            bm25_sim: Some(score),
            rerank_sim: None,
            is_basic: true,
            is_precision: score >= config.thresholds.precision,
            source: HeadingSource::Fallback1,
            related_context: None,
        };
        let entry = by_page.entry(page.title.clone()).or_insert_with(|| ScoredPage {
            doc_set: doc_set_name.to_string(),
            page_title: page.title.clone(),
            toc_path: page.toc_path.clone().unwrap_or_else(|| page.content_path.clone()),
            headings: Vec::new(),
            heading_count: 0,
            precision_count: 0,
            bm25_sim: Some(score),
            rerank_sim: None,
            is_basic: true,
            is_precision: false,
            source: HeadingSource::Fallback1,
        });
        entry.headings.push(heading);
    }

    for page in by_page.values_mut() {
        page.recompute_counts();
    }
    by_page.into_values().collect()
}

fn fallback2_hits_to_pages(
    doc_set_name: &str,
    hits: Vec<content_search::Fallback2Hit>,
    combined_query: &str,
    config: &SearchConfig,
) -> Vec<ScoredPage> {
    let mut by_page: HashMap<String, ScoredPage> = HashMap::new();
    let texts: Vec<String> = hits.iter().map(|h| h.heading_text.clone()).collect();
    let corpus = crate::bm25::Bm25Corpus::from_texts(&texts);

    for (idx, hit) in hits.into_iter().enumerate() {
        let score = corpus.score(combined_query, idx, config.bm25.k1, config.bm25.b);
        let heading = Heading {
            text: hit.heading_text,
            level: hit.heading_level,
            bm25_sim: Some(score),
            rerank_sim: None,
            is_basic: true,
            is_precision: score >= config.thresholds.precision,
            source: HeadingSource::Fallback2,
            related_context: Some(hit.related_context),
        };
        let entry = by_page.entry(hit.page_title.clone()).or_insert_with(|| ScoredPage {
            doc_set: doc_set_name.to_string(),
            page_title: hit.page_title.clone(),
            toc_path: std::path::PathBuf::new(),
            headings: Vec::new(),
            heading_count: 0,
            precision_count: 0,
            bm25_sim: Some(score),
            rerank_sim: None,
            is_basic: true,
            is_precision: false,
            source: HeadingSource::Fallback2,
        });
        entry.headings.push(heading);
    }

    for page in by_page.values_mut() {
        page.recompute_counts();
    }
    by_page.into_values().collect()
}

/// Merge two page lists by `(doc_set, page_title)` key. On collision,
/// headings are deduplicated by text (higher `bm25_sim` wins), and
/// `related_context` from a FALLBACK_2 entry is attached to a same-text
/// heading rather than creating a duplicate.
fn merge_pages(base: Vec<ScoredPage>, incoming: Vec<ScoredPage>) -> Vec<ScoredPage> {
    let mut by_key: HashMap<(String, String), ScoredPage> = base.into_iter().map(|p| (p.key(), p)).collect();

    for incoming_page in incoming {
        match by_key.get_mut(&incoming_page.key()) {
            None => {
                by_key.insert(incoming_page.key(), incoming_page);
            },
            Some(existing) => {
                merge_headings_into(existing, incoming_page.headings);
                if incoming_page.bm25_sim.unwrap_or(0.0) > existing.bm25_sim.unwrap_or(0.0) {
                    existing.bm25_sim = incoming_page.bm25_sim;
                }
            },
        }
    }

    for page in by_key.values_mut() {
        page.recompute_counts();
    }
    let mut merged: Vec<ScoredPage> = by_key.into_values().collect();
    merged.sort_by(|a, b| b.bm25_sim.unwrap_or(0.0).total_cmp(&a.bm25_sim.unwrap_or(0.0)));
    merged
}

fn merge_headings_into(page: &mut ScoredPage, incoming_headings: Vec<Heading>) {
    for incoming in incoming_headings {
        if let Some(existing) = page.headings.iter_mut().find(|h| h.text == incoming.text) {
            if incoming.related_context.is_some() && existing.related_context.is_none() {
                existing.related_context = incoming.related_context;
            }
            if incoming.bm25_sim.unwrap_or(0.0) > existing.bm25_sim.unwrap_or(0.0) {
                existing.bm25_sim = incoming.bm25_sim;
            }
        } else {
            page.headings.push(incoming);
        }
    }
}

/// Drop every heading with `level > min_level` across a page's retained
/// headings, so a matched parent section suppresses its own sub-sections.
fn hierarchical_filter(page: &mut ScoredPage) {
    let Some(min_level) = page.headings.iter().map(|h| h.level).min() else {
        return;
    };
    page.headings.retain(|h| h.level <= min_level);
    page.recompute_counts();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc_set(base: &std::path::Path, name: &str, pages: &[(&str, &str, &str)]) {
        let doc_dir = base.join(name);
        for (page_dir, toc, content) in pages {
            let dir = doc_dir.join(page_dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("docTOC.md"), toc).unwrap();
            fs::write(dir.join("docContent.md"), content).unwrap();
        }
    }

    #[tokio::test]
    async fn empty_query_after_skip_returns_unsuccessful() {
        let tmp = TempDir::new().unwrap();
        let request = SearchRequest {
            queries: vec!["the the".to_string()],
            skiped_keywords: vec!["the".to_string()],
            ..Default::default()
        };
        let result = search(tmp.path(), &request, &SearchConfig::default(), None).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn no_doc_sets_returns_unsuccessful() {
        let tmp = TempDir::new().unwrap();
        let request = SearchRequest { queries: vec!["install".to_string()], ..Default::default() };
        let result = search(tmp.path(), &request, &SearchConfig::default(), None).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn finds_pages_across_doc_set_via_bm25() {
        let tmp = TempDir::new().unwrap();
        write_doc_set(
            tmp.path(),
            "Docs@1.0",
            &[
                ("install", "## Installing the CLI\n## Configuring the editor\n", "# Installing the CLI\n\nbody\n"),
                ("other", "## Unrelated topic one\n## Unrelated topic two\n", "# Unrelated\n\nbody\n"),
            ],
        );
        let request = SearchRequest {
            queries: vec!["installing cli".to_string()],
            ..Default::default()
        };
        let mut config = SearchConfig::default();
        config.min_page_titles = 1;
        config.thresholds.page_title = 0.01;
        let result = search(tmp.path(), &request, &config, None).await.unwrap();
        assert!(result.success);
        assert!(result.results.iter().any(|p| p.page_title == "Installing the CLI"));
    }

    #[tokio::test]
    async fn language_mismatch_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_doc_set(tmp.path(), "Docs@1.0", &[("p", "- Getting Started\n- Installation\n", "# Getting Started\n")]);
        let request = SearchRequest {
            queries: vec!["如何安装这个软件".to_string()],
            ..Default::default()
        };
        let err = search(tmp.path(), &request, &SearchConfig::default(), None).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::LanguageMismatch { .. }));
    }
}
