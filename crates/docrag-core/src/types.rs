//! Core data structures for the docrag retrieval pipeline.
//!
//! These types flow between the seven pipeline stages described in the
//! system overview: [`Heading`] and [`ScoredPage`] are built up by the
//! search stage (BM25 recall, fallbacks, reranking), [`SearchResult`] is
//! its final payload, and [`ExtractionResult`] / [`DocRagResult`] carry the
//! content-extraction and final-answer stages.
//!
//! ## Type categories
//!
//! - **Corpus**: [`DocSet`], [`Page`]
//! - **Search**: [`Heading`], [`ScoredPage`], [`SearchResult`], [`HeadingSource`]
//! - **Routing**: [`Scene`], [`RoutingResult`]
//! - **Extraction**: [`ExtractionResult`]
//! - **Final answer**: [`SourceMeta`], [`DocRagResult`]
//! - **Diagnostics**: [`Diagnostic`], [`DiagnosticSeverity`]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A named corpus directory whose name encodes `{name}@{version}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSet {
    /// Directory name, e.g. `"React_Docs@19.0"`.
    pub name: String,
    /// Absolute path to the doc-set directory.
    pub path: PathBuf,
}

/// A single crawled page: a directory holding `docContent.md` and
/// optionally `docTOC.md`.
#[derive(Debug, Clone)]
pub struct Page {
    /// Canonical page title (first `#` heading of `docContent.md`, or the
    /// directory name as a fallback).
    pub title: String,
    /// Path to the page's directory.
    pub dir: PathBuf,
    /// Path to `docContent.md` (always present per the corpus invariant).
    pub content_path: PathBuf,
    /// Path to `docTOC.md`, if the page has one.
    pub toc_path: Option<PathBuf>,
}

/// Which recall/rerank strategy produced a [`Heading`] or [`ScoredPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeadingSource {
    /// Recalled via BM25 scoring over `docTOC.md`.
    Bm25,
    /// Recalled via regex over `docTOC.md` lines (FALLBACK_1).
    Fallback1,
    /// Recalled via regex over `docContent.md` lines, with context (FALLBACK_2).
    Fallback2,
    /// Re-scored by the embedding [`crate::matcher::Matcher`].
    Reranker,
    /// Re-scored by the LLM reranker (stage 1.5).
    LlmReranker,
}

impl std::fmt::Display for HeadingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bm25 => "BM25",
            Self::Fallback1 => "FALLBACK_1",
            Self::Fallback2 => "FALLBACK_2",
            Self::Reranker => "RERANKER",
            Self::LlmReranker => "LLM_RERANKER",
        };
        f.write_str(s)
    }
}

/// A candidate section inside a [`Page`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    /// Heading text including leading `#` hashes.
    pub text: String,
    /// Heading level: 1-6, or 4 for `-` list-item TOC lines.
    pub level: u8,
    /// Lexical score from BM25 recall, if computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bm25_sim: Option<f32>,
    /// Semantic score from an embedding or LLM reranker, if computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_sim: Option<f32>,
    /// Passes the primary (basic) threshold.
    pub is_basic: bool,
    /// Passes the stricter precision threshold.
    pub is_precision: bool,
    /// Which strategy produced this heading.
    pub source: HeadingSource,
    /// Surrounding content snippet, for FALLBACK_2 hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_context: Option<String>,
}

impl Heading {
    /// Invariant check used by tests: precision implies basic.
    #[must_use]
    pub const fn precision_implies_basic(&self) -> bool {
        !self.is_precision || self.is_basic
    }
}

/// Aggregation over one [`Page`]'s surviving headings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPage {
    /// Owning doc-set name.
    pub doc_set: String,
    /// Canonical page title.
    pub page_title: String,
    /// Path to the page's `docTOC.md` (or `docContent.md` when no TOC exists).
    pub toc_path: PathBuf,
    /// Surviving headings, after thresholding/filtering.
    pub headings: Vec<Heading>,
    /// `headings.len()`.
    pub heading_count: usize,
    /// Count of headings with `is_precision == true`.
    pub precision_count: usize,
    /// Page-level BM25 score: max of heading scores, or the TOC-level score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bm25_sim: Option<f32>,
    /// Page-level semantic score (set when `rerank_scopes` includes `page_title`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_sim: Option<f32>,
    /// Passes the primary (basic) threshold at the page level.
    pub is_basic: bool,
    /// Passes the stricter precision threshold at the page level.
    pub is_precision: bool,
    /// Which strategy produced this page's leading score.
    pub source: HeadingSource,
}

impl ScoredPage {
    /// Recompute `heading_count` / `precision_count` from `headings`.
    pub fn recompute_counts(&mut self) {
        self.heading_count = self.headings.len();
        self.precision_count = self.headings.iter().filter(|h| h.is_precision).count();
    }

    /// Page-level dedup key.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.doc_set.clone(), self.page_title.clone())
    }
}

/// Which fallback strategies contributed to a [`SearchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackUsed {
    /// Only FALLBACK_1 (TOC regex) contributed new pages/headings.
    Fallback1,
    /// Only FALLBACK_2 (content regex) contributed new pages/headings.
    Fallback2,
    /// Both fallback strategies contributed.
    Both,
}

impl Serialize for FallbackUsed {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            Self::Fallback1 => "FALLBACK_1",
            Self::Fallback2 => "FALLBACK_2",
            Self::Both => "FALLBACK_1+FALLBACK_2",
        };
        serializer.serialize_str(s)
    }
}

/// Top-level payload of the search stage (phase 1).
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Whether the search met `min_page_titles`.
    pub success: bool,
    /// Normalized query list actually searched (after skiped-keyword rewriting).
    pub query: Vec<String>,
    /// Doc-sets that were actually searched.
    pub doc_sets_found: Vec<String>,
    /// Emitted pages, ordered by discovery then page-level score.
    pub results: Vec<ScoredPage>,
    /// Which fallback strategy (if any) contributed results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<FallbackUsed>,
    /// Human-readable diagnostic message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Non-fatal issues encountered while searching.
    pub diagnostics: Vec<Diagnostic>,
}

impl SearchResult {
    /// Render this result as the internal structured JSON shape used by
    /// `--stop-at-phase 1` debugging.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success,
            "query": self.query,
            "doc_sets_found": self.doc_sets_found,
            "fallback_used": self.fallback_used.map(|f| match f {
                FallbackUsed::Fallback1 => "FALLBACK_1",
                FallbackUsed::Fallback2 => "FALLBACK_2",
                FallbackUsed::Both => "FALLBACK_1+FALLBACK_2",
            }),
            "results": self.results.iter().map(|p| serde_json::json!({
                "doc_set": p.doc_set,
                "page_title": p.page_title,
                "toc_path": p.toc_path,
                "bm25_sim": p.bm25_sim,
                "rerank_sim": p.rerank_sim,
                "heading_count": p.heading_count,
                "precision_count": p.precision_count,
                "source": p.source.to_string(),
                "headings": p.headings.iter().map(|h| serde_json::json!({
                    "level": h.level,
                    "text": h.text,
                    "bm25_sim": h.bm25_sim,
                    "rerank_sim": h.rerank_sim,
                })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        })
    }
}

/// Either a single query string or a list of query variants.
///
/// The pipeline always normalizes to a list; a single string is a list of one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    /// A single query string.
    Single(String),
    /// Multiple optimized query variants (stage 0a output).
    Multiple(Vec<String>),
}

impl QueryInput {
    /// Normalize to a list of non-empty, trimmed query strings.
    #[must_use]
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s.trim().to_string()],
            Self::Multiple(list) => list.iter().map(|s| s.trim().to_string()).collect(),
        }
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
    }

    /// The "combined query": queries joined with spaces, used for single-string
    /// BM25 scoring.
    #[must_use]
    pub fn combined(&self) -> String {
        self.normalize().join(" ")
    }
}

/// The answer-shape classification from stage 0b.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    /// A single factual answer, quickly verifiable.
    FactLookup,
    /// Requires a verbatim reference (API signature, config key, ...).
    FaithfulReference,
    /// Requires a verbatim, ordered set of steps.
    FaithfulHowTo,
    /// A conceptual explanation.
    ConceptLearning,
    /// A synthesized procedure.
    HowTo,
    /// A comparison between two or more things.
    Comparison,
    /// An open-ended exploratory question.
    Exploration,
}

impl Scene {
    /// Whether this scene requires verbatim quotes rather than paraphrased
    /// synthesis.
    #[must_use]
    pub const fn requires_verbatim(self) -> bool {
        matches!(self, Self::FaithfulReference | Self::FaithfulHowTo)
    }
}

/// Output of stage 0b: scene classification plus routing signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    /// Classified scene.
    pub scene: Scene,
    /// Confidence in the classification, in `[0, 1]`.
    pub confidence: f32,
    /// How ambiguous the query is, in `[0, 1]`.
    pub ambiguity: f32,
    /// How much breadth of coverage the answer likely needs, in `[0, 1]`.
    pub coverage_need: f32,
    /// Recommended reranker threshold, in `[0.30, 0.80]`.
    pub reranker_threshold: f32,
}

/// Severity level for diagnostic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Critical issue; the enclosing operation could not complete.
    Error,
    /// Non-fatal issue; processing continued with reduced fidelity.
    Warn,
    /// Informational note about a processing decision.
    Info,
}

/// A single diagnostic message surfaced from any pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of this diagnostic.
    pub severity: DiagnosticSeverity,
    /// Human-readable description.
    pub message: String,
    /// Doc-set this diagnostic pertains to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_set: Option<String>,
}

impl Diagnostic {
    /// Construct a `Warn`-severity diagnostic scoped to a doc-set.
    #[must_use]
    pub fn warn(doc_set: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warn,
            message: message.into(),
            doc_set: Some(doc_set.into()),
        }
    }
}

/// Output of the Reader stage (phase 2): extracted Markdown content keyed by
/// title, plus aggregate line-count bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted Markdown, keyed by page/section title.
    pub contents: HashMap<String, String>,
    /// `contents.len()`.
    pub document_count: usize,
    /// Sum of `individual_counts`.
    pub total_line_count: usize,
    /// Per-title line counts.
    pub individual_counts: HashMap<String, usize>,
    /// The configured line-count threshold this result was checked against.
    pub threshold: usize,
    /// `true` iff `total_line_count > threshold`.
    pub requires_processing: bool,
}

impl ExtractionResult {
    /// Build an `ExtractionResult` from a title→content map, computing all
    /// derived fields deterministically from the inputs.
    #[must_use]
    pub fn new(contents: HashMap<String, String>, threshold: usize) -> Self {
        let individual_counts: HashMap<String, usize> = contents
            .iter()
            .map(|(title, text)| (title.clone(), text.lines().count()))
            .collect();
        let total_line_count: usize = individual_counts.values().sum();
        Self {
            document_count: contents.len(),
            requires_processing: total_line_count > threshold,
            total_line_count,
            individual_counts,
            contents,
            threshold,
        }
    }
}

/// A single citation in the final answer's `Sources` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMeta {
    /// Page title.
    pub title: String,
    /// Original crawled URL, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Local path within the corpus.
    pub local_path: PathBuf,
}

/// The pipeline's public result type: a formatted, source-cited Markdown
/// answer plus the bookkeeping a caller needs to judge confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRagResult {
    /// The formatted Markdown answer, ending in a `Sources` block.
    pub output: String,
    /// The scene this answer was rendered for.
    pub scene: Scene,
    /// Sources cited in `output`, in citation order.
    pub sources: Vec<SourceMeta>,
    /// Whether the pipeline completed successfully end to end.
    pub success: bool,
    /// Number of documents/sections extracted by the Reader.
    pub documents_extracted: usize,
    /// Total extracted line count.
    pub total_lines: usize,
    /// Whether `total_lines` exceeded the configured threshold.
    pub requires_processing: bool,
    /// Optional LLM "thinking" trace, when the LLM client returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Raw LLM response, preserved for debugging/retry on parse failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}
