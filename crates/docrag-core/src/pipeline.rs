//! Pipeline wiring: the seven stages strung together behind [`retrieve`],
//! the crate's single public entry point.
//!
//! Each stage after 0a/0b is driven off whatever the previous stage
//! produced, and every stage can be the last one that runs — a caller can
//! pass [`StopAtPhase`] to stop early for debugging, getting back a
//! [`DocRagResult`] whose `output` is the structured JSON of whatever stage
//! it stopped at.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::llm::optimizer::{self, OptimizerConfig};
use crate::llm::reranker as llm_reranker;
use crate::llm::router::{self, RouterConfig};
use crate::llm::LlmClient;
use crate::matcher::Matcher;
use crate::output::{self, OutputRequest};
use crate::reader;
use crate::searcher::{self, SearchRequest};
use crate::types::{DocRagResult, DocSet, Scene, SourceMeta};
use std::collections::HashMap;
use std::path::Path;

/// Which stage to stop at, for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopAtPhase {
    /// Run query optimization only.
    Phase0a,
    /// Run optimization + routing only.
    Phase0b,
    /// Run through the Searcher (stage 1), no LLM reranking or reading.
    Phase1,
    /// Run through the LLM reranker (stage 1.5).
    Phase1_5,
    /// Run through content extraction (stage 2).
    Phase2,
    /// Run the full pipeline through SceneOutput.
    #[default]
    Phase4,
}

/// Collaborators and knobs every stage needs. `llm` is optional: when
/// absent, stages 0a/0b/1.5 are skipped and their outputs default to the
/// raw query, an `Exploration` scene, and an unmodified `SearchResult`
/// respectively.
pub struct PipelineRequest<'a> {
    /// The raw user query.
    pub query: &'a str,
    /// Base directory holding doc-set directories.
    pub base_dir: &'a Path,
    /// Search/rerank/threshold configuration.
    pub config: &'a SearchConfig,
    /// LLM client driving stages 0a/0b/1.5, if configured.
    pub llm: Option<&'a dyn LlmClient>,
    /// Embedding matcher driving stage-1 reranking, if configured.
    pub matcher: Option<&'a dyn Matcher>,
    /// Model/prompt configuration for stage 0a.
    pub optimizer_config: Option<OptimizerConfig>,
    /// Model/prompt configuration for stage 0b.
    pub router_config: Option<RouterConfig>,
    /// Line-count threshold the Reader checks `requires_processing` against.
    pub extraction_threshold: usize,
    /// Where to stop early.
    pub stop_at: StopAtPhase,
}

impl<'a> PipelineRequest<'a> {
    /// Build a request with every LLM/matcher collaborator disabled and
    /// `stop_at` defaulted to [`StopAtPhase::Phase4`] (run to completion).
    /// Useful as a base for struct-update syntax in callers that only need
    /// a subset of stages.
    #[must_use]
    pub fn new(query: &'a str, base_dir: &'a Path, config: &'a SearchConfig, extraction_threshold: usize) -> Self {
        Self {
            query,
            base_dir,
            config,
            llm: None,
            matcher: None,
            optimizer_config: None,
            router_config: None,
            extraction_threshold,
            stop_at: StopAtPhase::default(),
        }
    }
}

/// Run the full retrieval pipeline end to end (or through `request.stop_at`).
///
/// # Errors
///
/// Returns an error for fatal conditions (corpus I/O failure, language
/// mismatch propagated from the Searcher). Anything confined to the LLM or
/// matcher is caught internally and degrades the relevant stage instead of
/// aborting.
pub async fn retrieve(request: &PipelineRequest<'_>) -> Result<DocRagResult> {
    // Stage 0a: QueryOptimizer.
    let optimization = match (request.llm, &request.optimizer_config) {
        (Some(client), Some(config)) => Some(optimizer::optimize(client, config, request.query).await?),
        _ => None,
    };

    let queries = optimization
        .as_ref()
        .filter(|o| !o.optimized_queries.is_empty())
        .map_or_else(
            || vec![request.query.to_string()],
            |o| o.optimized_queries.iter().map(|q| q.query.clone()).collect(),
        );
    let domain_nouns = optimization.as_ref().map(|o| o.query_analysis.domain_nouns.clone()).unwrap_or_default();
    let predicate_verbs = optimization.as_ref().map(|o| o.query_analysis.predicate_verbs.clone()).unwrap_or_default();
    let target_doc_sets = optimization.as_ref().map(|o| o.query_analysis.doc_set.clone()).unwrap_or_default();

    if request.stop_at == StopAtPhase::Phase0a {
        return Ok(stage_stub(Scene::Exploration, serde_json::json!({
            "phase": "0a",
            "queries": queries,
            "domain_nouns": domain_nouns,
            "predicate_verbs": predicate_verbs,
        })));
    }

    // Stage 0b: QueryRouter.
    let routing = match (request.llm, &request.router_config) {
        (Some(client), Some(config)) => Some(router::route(client, config, request.query).await?),
        _ => None,
    };
    let scene = routing.as_ref().map_or(Scene::Exploration, |r| r.scene);

    if request.stop_at == StopAtPhase::Phase0b {
        return Ok(stage_stub(scene, serde_json::json!({
            "phase": "0b",
            "scene": scene,
            "confidence": routing.as_ref().map(|r| r.confidence),
        })));
    }

    // Stage 1: Searcher.
    let search_request = SearchRequest {
        queries,
        target_doc_sets,
        domain_nouns,
        predicate_verbs,
        skiped_keywords: Vec::new(),
    };
    let mut search_result = searcher::search(request.base_dir, &search_request, request.config, request.matcher).await?;

    if request.stop_at == StopAtPhase::Phase1 {
        return Ok(DocRagResult {
            output: search_result.to_json_value().to_string(),
            scene,
            sources: Vec::new(),
            success: search_result.success,
            documents_extracted: 0,
            total_lines: 0,
            requires_processing: false,
            thinking: None,
            raw_response: None,
        });
    }

    // Stage 1.5: LLMReranker (optional).
    let mut thinking = None;
    let mut raw_response = None;
    if request.config.llm_reranker.enabled {
        if let Some(client) = request.llm {
            let llm_config = llm_reranker::LlmRerankerConfig {
                model: request.optimizer_config.as_ref().map_or_else(|| "default".to_string(), |c| c.model.clone()),
                max_tokens: 2000,
                temperature: 0.0,
                system_prompt: "Score each heading's relevance to the query on a 0 to 1 scale.".to_string(),
                threshold: request.config.reranker.threshold,
                threshold_adjustment: request.config.llm_reranker.threshold_adjustment,
                min_headings_count: request.config.llm_reranker.min_headings_count,
            };
            let reranked = llm_reranker::rerank(client, &llm_config, &search_result).await?;
            search_result.results = reranked.data;
            thinking = reranked.thinking;
            raw_response = reranked.raw_response;
        }
    }

    if request.stop_at == StopAtPhase::Phase1_5 {
        return Ok(DocRagResult {
            output: search_result.to_json_value().to_string(),
            scene,
            sources: Vec::new(),
            success: search_result.success,
            documents_extracted: 0,
            total_lines: 0,
            requires_processing: false,
            thinking,
            raw_response,
        });
    }

    if !search_result.success {
        return Ok(DocRagResult {
            output: search_result.message.clone().unwrap_or_else(|| "no results".to_string()),
            scene,
            sources: Vec::new(),
            success: false,
            documents_extracted: 0,
            total_lines: 0,
            requires_processing: false,
            thinking,
            raw_response,
        });
    }

    // Stage 2: Reader.
    let sections: Vec<reader::SectionRequest> = search_result
        .results
        .iter()
        .map(|page| reader::SectionRequest {
            doc_set: DocSet { name: page.doc_set.clone(), path: request.base_dir.join(&page.doc_set) },
            title: page.page_title.clone(),
            headings: page.headings.iter().map(|h| h.text.clone()).collect(),
        })
        .collect();
    let extraction = reader::extract_multi_by_headings(&sections, request.extraction_threshold)?;

    if request.stop_at == StopAtPhase::Phase2 {
        return Ok(DocRagResult {
            output: serde_json::to_string(&extraction)?,
            scene,
            sources: Vec::new(),
            success: true,
            documents_extracted: extraction.document_count,
            total_lines: extraction.total_line_count,
            requires_processing: extraction.requires_processing,
            thinking,
            raw_response,
        });
    }

    // Stage 4: SceneOutput.
    let sources: Vec<SourceMeta> = search_result
        .results
        .iter()
        .map(|page| SourceMeta {
            title: page.page_title.clone(),
            source_url: None,
            local_path: request.base_dir.join(&page.doc_set).join(&page.page_title).join("docContent.md"),
        })
        .collect();

    // Keyed identically to extract_multi_by_headings's output: `"{doc_set}::{title}"`.
    let contents: HashMap<String, String> = sources
        .iter()
        .zip(search_result.results.iter())
        .filter_map(|(source, page)| {
            let key = format!("{}::{}", page.doc_set, page.page_title);
            extraction.contents.get(&key).map(|content| (source.title.clone(), content.clone()))
        })
        .collect();

    let output = output::render(&OutputRequest {
        query: request.query,
        scene,
        contents: &contents,
        sources: &sources,
        compression_applied: extraction.requires_processing,
    });

    Ok(DocRagResult {
        output,
        scene,
        sources,
        success: true,
        documents_extracted: extraction.document_count,
        total_lines: extraction.total_line_count,
        requires_processing: extraction.requires_processing,
        thinking,
        raw_response,
    })
}

fn stage_stub(scene: Scene, payload: serde_json::Value) -> DocRagResult {
    DocRagResult {
        output: payload.to_string(),
        scene,
        sources: Vec::new(),
        success: true,
        documents_extracted: 0,
        total_lines: 0,
        requires_processing: false,
        thinking: None,
        raw_response: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc_set(base: &Path, name: &str, pages: &[(&str, &str, &str)]) {
        let doc_dir = base.join(name);
        for (page_dir, toc, content) in pages {
            let dir = doc_dir.join(page_dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("docTOC.md"), toc).unwrap();
            fs::write(dir.join("docContent.md"), content).unwrap();
        }
    }

    #[tokio::test]
    async fn retrieve_without_llm_falls_back_to_raw_query_and_exploration_scene() {
        let tmp = TempDir::new().unwrap();
        write_doc_set(
            tmp.path(),
            "Docs@1.0",
            &[("install", "## Installing the CLI\n", "# Installing the CLI\n\nRun setup.\n")],
        );
        let mut config = SearchConfig::default();
        config.min_page_titles = 1;
        config.thresholds.page_title = 0.01;

        let request = PipelineRequest::new("installing cli", tmp.path(), &config, 1000);
        let result = retrieve(&request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.scene, Scene::Exploration);
        assert!(result.output.contains("Run setup."));
        assert!(result.output.contains("## Sources"));
    }

    #[tokio::test]
    async fn retrieve_stops_at_phase1_with_structured_json() {
        let tmp = TempDir::new().unwrap();
        write_doc_set(
            tmp.path(),
            "Docs@1.0",
            &[("install", "## Installing the CLI\n", "# Installing the CLI\n\nbody\n")],
        );
        let mut config = SearchConfig::default();
        config.min_page_titles = 1;
        config.thresholds.page_title = 0.01;

        let mut request = PipelineRequest::new("installing cli", tmp.path(), &config, 1000);
        request.stop_at = StopAtPhase::Phase1;
        let result = retrieve(&request).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["success"], true);
    }

    #[tokio::test]
    async fn retrieve_reports_failure_without_aborting() {
        let tmp = TempDir::new().unwrap();
        let config = SearchConfig::default();
        let request = PipelineRequest::new("nothing matches anything here", tmp.path(), &config, 1000);
        let result = retrieve(&request).await.unwrap();
        assert!(!result.success);
    }
}
