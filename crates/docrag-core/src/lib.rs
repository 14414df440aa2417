//! # docrag-core
//!
//! Core retrieval pipeline for `docrag`: a local Documentation
//! Retrieval-Augmented Generation engine that turns a natural-language
//! question into a structured, source-cited Markdown answer grounded in a
//! filesystem-resident corpus of pre-crawled documentation sets.
//!
//! ## Architecture
//!
//! The crate implements the seven pipeline stages end to end behind
//! [`pipeline::retrieve`]:
//!
//! - **Stage 0a/0b**: [`llm::optimizer`] and [`llm::router`] drive an
//!   [`llm::LlmClient`] to produce optimized query variants and a scene
//!   classification.
//! - **Stage 1**: [`searcher`] orchestrates [`bm25`] recall over
//!   tables-of-contents, [`fallback1`]/[`content_search`] grep fallbacks,
//!   and [`reranker`] embedding rescoring behind the [`matcher::Matcher`]
//!   capability.
//! - **Stage 1.5**: [`llm::reranker`] optionally rescores headings via the
//!   LLM client with a recoverable threshold.
//! - **Stage 2**: [`reader`] slices `docContent.md` into whole pages or
//!   heading-bounded sections.
//! - **Stage 4**: [`output`] renders the final scene-conditioned Markdown
//!   answer with a `Sources` block.
//!
//! ## Quick start
//!
//! ```no_run
//! use docrag_core::{SearchConfig, pipeline::{PipelineRequest, retrieve}};
//! use std::path::Path;
//!
//! let config = SearchConfig::default();
//! let request = PipelineRequest::new("how do I install this", Path::new("/tmp/corpus"), &config, 4000);
//! let result = tokio::runtime::Runtime::new()?.block_on(retrieve(&request))?;
//! println!("{}", result.output);
//! # Ok::<(), docrag_core::Error>(())
//! ```
//!
//! ## Error handling
//!
//! All fallible operations return [`Result<T, Error>`]; see [`error`] for
//! the taxonomy and which errors abort a request versus degrade a single
//! stage.

/// Okapi BM25 recall over `docTOC.md` files.
pub mod bm25;
/// Configuration for every pipeline stage.
pub mod config;
/// FALLBACK_2: keyword search over `docContent.md` with surrounding context.
pub mod content_search;
/// Doc-set and page discovery on disk.
pub mod corpus;
/// Error types and result alias.
pub mod error;
/// FALLBACK_1: regex search over `docTOC.md` lines.
pub mod fallback1;
/// TOC/heading line parsing.
pub mod heading;
/// Language-consistency guard.
pub mod language;
/// LLM client contract and the three LLM-driven stages.
pub mod llm;
/// The `Matcher` embedding capability and its three backends.
pub mod matcher;
/// SceneOutput: final answer formatting.
pub mod output;
/// Pipeline wiring: the `retrieve()` entry point.
pub mod pipeline;
/// Reader: content extraction by title or heading section.
pub mod reader;
/// Stage-1 embedding reranking: `HeadingReranker` and `BatchReranker`.
pub mod reranker;
/// Searcher orchestration: the full stage-1 flow.
pub mod searcher;
/// Tokenization, CJK-ratio detection, and rerank-candidate preprocessing.
pub mod text;
/// Core data structures shared across every stage.
pub mod types;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use pipeline::{retrieve, PipelineRequest, StopAtPhase};
pub use types::{
    DocRagResult, DocSet, ExtractionResult, Heading, HeadingSource, Page, RoutingResult, Scene,
    ScoredPage, SearchResult, SourceMeta,
};
