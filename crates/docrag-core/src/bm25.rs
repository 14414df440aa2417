//! Okapi BM25 scoring, applied per-page rather than corpus-wide.
//!
//! Document-frequency statistics are deliberately scoped to a single page's
//! headings rather than the whole doc-set: each heading is treated as a
//! document, and df-statistics are built over just the headings of that
//! page. This makes headings within one page comparable to each other, at
//! the cost of comparability across pages — an intentional simplification,
//! not an oversight.

use crate::error::Result;
use crate::heading::parse_heading_line;
use crate::types::{Heading, HeadingSource, Page, ScoredPage};
use crate::text::tokenize;

/// A small BM25 index built once per page (or once over a single
/// concatenated document, for the page-title score).
#[derive(Debug, Clone)]
pub struct Bm25Corpus {
    /// Tokenized form of every document in the corpus.
    docs: Vec<Vec<String>>,
    /// Document frequency (number of docs containing the term) per term.
    doc_freq: std::collections::HashMap<String, usize>,
    /// Average document length in tokens.
    avg_doc_len: f64,
}

impl Bm25Corpus {
    /// Build a corpus from raw text documents, tokenizing each with
    /// [`crate::text::tokenize`].
    #[must_use]
    pub fn from_texts(texts: &[String]) -> Self {
        let docs: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
        Self::from_tokenized(docs)
    }

    /// Build a corpus from pre-tokenized documents.
    #[must_use]
    pub fn from_tokenized(docs: Vec<Vec<String>>) -> Self {
        let mut doc_freq = std::collections::HashMap::new();
        for doc in &docs {
            let unique: std::collections::HashSet<&String> = doc.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let total_len: usize = docs.iter().map(Vec::len).sum();
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };
        Self { docs, doc_freq, avg_doc_len }
    }

    /// Number of documents in this corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether this corpus has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (((n - df + 0.5) / (df + 0.5)) + 1.0).ln()
    }

    /// Score a pre-tokenized query against document `doc_index`.
    ///
    /// Returns 0.0 if `doc_index` is out of range or the document is empty.
    #[must_use]
    pub fn score_tokens(&self, query_tokens: &[String], doc_index: usize, k1: f32, b: f32) -> f32 {
        let Some(doc) = self.docs.get(doc_index) else {
            return 0.0;
        };
        if doc.is_empty() {
            return 0.0;
        }
        let doc_len = doc.len() as f64;
        let k1 = f64::from(k1);
        let b = f64::from(b);

        let mut term_counts = std::collections::HashMap::new();
        for term in doc {
            *term_counts.entry(term.as_str()).or_insert(0usize) += 1;
        }

        let mut score = 0.0;
        for term in query_tokens {
            let Some(&tf) = term_counts.get(term.as_str()) else {
                continue;
            };
            let tf = tf as f64;
            let idf = self.idf(term);
            let denom = tf + k1 * (1.0 - b + b * (doc_len / self.avg_doc_len.max(1.0)));
            score += idf * (tf * (k1 + 1.0)) / denom;
        }
        score as f32
    }

    /// Score a raw query string against document `doc_index`, normalized to
    /// `[0, 1]` via `score / (score + 1)` so it's comparable to embedding
    /// cosine-similarity scores downstream (both thresholds are
    /// expressed in that same `[0, 1]` scale).
    #[must_use]
    pub fn score(&self, query: &str, doc_index: usize, k1: f32, b: f32) -> f32 {
        let query_tokens = tokenize(query);
        let raw = self.score_tokens(&query_tokens, doc_index, k1, b);
        normalize_score(raw)
    }
}

/// Squash an unbounded BM25 score into `[0, 1)` for threshold comparability.
#[must_use]
pub fn normalize_score(raw: f32) -> f32 {
    if raw <= 0.0 { 0.0 } else { raw / (raw + 1.0) }
}

/// Thresholds and parameters for [`recall`], bundled so callers don't have to
/// pass seven scalars.
#[derive(Debug, Clone, Copy)]
pub struct RecallParams {
    /// BM25 term-frequency saturation.
    pub k1: f32,
    /// BM25 length normalization.
    pub b: f32,
    /// Minimum score for a heading to be `is_basic`.
    pub threshold_headings: f32,
    /// Minimum score for a heading to be `is_precision`.
    pub threshold_precision: f32,
    /// Minimum page-level score to keep a page on title match alone.
    pub threshold_page_title: f32,
    /// Minimum count of `is_basic` headings that keeps a page even under the title threshold.
    pub min_headings: usize,
}

/// BM25Recall: score every page in `pages` against `queries`,
/// keeping pages that clear the page-title threshold or have enough basic
/// headings. Headings are *not* filtered here — callers filter by `is_basic`
/// once reranking has had a chance to run over the full set.
///
/// A missing `docTOC.md` skips the page (falls back silently);
/// a read error on a TOC that's known to exist propagates.
///
/// # Errors
///
/// Returns an I/O error if a present TOC file can't be read.
pub fn recall(doc_set_name: &str, pages: &[Page], queries: &[String], params: RecallParams) -> Result<Vec<ScoredPage>> {
    let combined_query = queries.join(" ");
    let mut scored_pages = Vec::new();

    for page in pages {
        let Some(toc_path) = page.toc_path.as_deref() else {
            continue;
        };
        let Ok(toc_content) = std::fs::read_to_string(toc_path) else {
            continue;
        };

        let parsed: Vec<_> = toc_content.lines().filter_map(parse_heading_line).collect();
        if parsed.is_empty() {
            continue;
        }

        let heading_corpus = Bm25Corpus::from_texts(&parsed.iter().map(|p| p.text.clone()).collect::<Vec<_>>());
        let title_corpus = Bm25Corpus::from_texts(&[toc_content]);
        let page_score = title_corpus.score(&combined_query, 0, params.k1, params.b);

        let mut headings = Vec::with_capacity(parsed.len());
        for (idx, parsed_heading) in parsed.iter().enumerate() {
            let score = heading_corpus.score(&combined_query, idx, params.k1, params.b);
            headings.push(Heading {
                text: parsed_heading.text.clone(),
                level: parsed_heading.level,
                bm25_sim: Some(score),
                rerank_sim: None,
                is_basic: score >= params.threshold_headings,
                is_precision: score >= params.threshold_precision,
                source: HeadingSource::Bm25,
                related_context: None,
            });
        }

        let basic_count = headings.iter().filter(|h| h.is_basic).count();
        if page_score < params.threshold_page_title && basic_count < params.min_headings {
            continue;
        }

        let mut scored_page = ScoredPage {
            doc_set: doc_set_name.to_string(),
            page_title: page.title.clone(),
            toc_path: toc_path.to_path_buf(),
            headings,
            heading_count: 0,
            precision_count: 0,
            bm25_sim: Some(page_score),
            rerank_sim: None,
            is_basic: page_score >= params.threshold_headings,
            is_precision: page_score >= params.threshold_precision,
            source: HeadingSource::Bm25,
        };
        scored_page.recompute_counts();
        scored_pages.push(scored_page);
    }

    scored_pages.sort_by(|a, b| b.bm25_sim.unwrap_or(0.0).total_cmp(&a.bm25_sim.unwrap_or(0.0)));
    Ok(scored_pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_params() -> RecallParams {
        RecallParams {
            k1: 1.2,
            b: 0.75,
            threshold_headings: 0.25,
            threshold_precision: 0.70,
            threshold_page_title: 0.60,
            min_headings: 2,
        }
    }

    fn page_with_toc(dir: &std::path::Path, toc: &str) -> Page {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("docContent.md"), "# Title\n").unwrap();
        fs::write(dir.join("docTOC.md"), toc).unwrap();
        Page {
            title: "Title".to_string(),
            dir: dir.to_path_buf(),
            content_path: dir.join("docContent.md"),
            toc_path: Some(dir.join("docTOC.md")),
        }
    }

    #[test]
    fn recall_skips_pages_without_toc() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path()).unwrap();
        fs::write(tmp.path().join("docContent.md"), "# Title\n").unwrap();
        let page = Page {
            title: "Title".to_string(),
            dir: tmp.path().to_path_buf(),
            content_path: tmp.path().join("docContent.md"),
            toc_path: None,
        };
        let result = recall("Docs@1.0", &[page], &["install".to_string()], default_params()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn recall_keeps_page_passing_title_threshold() {
        let tmp = TempDir::new().unwrap();
        let page = page_with_toc(tmp.path(), "## Installing the CLI\n## Configuring the editor\n");
        let result = recall(
            "Docs@1.0",
            &[page],
            &["installing".to_string(), "cli".to_string()],
            default_params(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].headings.len(), 2);
        assert!(result[0].headings[0].bm25_sim.is_some());
    }

    #[test]
    fn recall_drops_page_with_no_signal() {
        let tmp = TempDir::new().unwrap();
        let page = page_with_toc(tmp.path(), "## Unrelated heading one\n## Unrelated heading two\n");
        let result = recall("Docs@1.0", &[page], &["zzz-no-match-zzz".to_string()], default_params()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn exact_term_match_scores_higher_than_no_match() {
        let corpus = Bm25Corpus::from_texts(&[
            "Installing the CLI".to_string(),
            "Configuring your editor".to_string(),
        ]);
        let hit = corpus.score("installing", 0, 1.2, 0.75);
        let miss = corpus.score("installing", 1, 1.2, 0.75);
        assert!(hit > miss);
        assert!(miss.abs() < f32::EPSILON);
    }

    #[test]
    fn normalized_scores_stay_in_unit_range() {
        let corpus = Bm25Corpus::from_texts(&["skills skills skills".to_string()]);
        let score = corpus.score("skills", 0, 1.2, 0.75);
        assert!((0.0..1.0).contains(&score));
    }

    #[test]
    fn out_of_range_doc_index_scores_zero() {
        let corpus = Bm25Corpus::from_texts(&["a b c".to_string()]);
        assert_eq!(corpus.score("a", 5, 1.2, 0.75), 0.0);
    }

    #[test]
    fn empty_corpus_does_not_panic() {
        let corpus = Bm25Corpus::from_texts(&[]);
        assert!(corpus.is_empty());
        assert_eq!(corpus.score("anything", 0, 1.2, 0.75), 0.0);
    }

    #[test]
    fn cjk_query_tokenizes_per_character() {
        let corpus = Bm25Corpus::from_texts(&["快速开始指南".to_string()]);
        let score = corpus.score("快速", 0, 1.2, 0.75);
        assert!(score > 0.0);
    }
}
