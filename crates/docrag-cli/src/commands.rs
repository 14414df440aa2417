//! Subcommand implementations.

use crate::cli::StopAt;
use anyhow::{Context, Result};
use colored::Colorize;
use docrag_core::pipeline::{retrieve, PipelineRequest};
use docrag_core::{Error, SearchConfig};
use std::path::Path;

/// Exit code contract: 0 success, 1 no-results, 2 language
/// mismatch, 3 LLM failure.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NO_RESULTS: i32 = 1;
pub const EXIT_LANGUAGE_MISMATCH: i32 = 2;
pub const EXIT_LLM_FAILURE: i32 = 3;

/// Run the full pipeline (or stop early at `stop_at`) and print the result.
pub async fn run_query(query: &str, base_dir: &Path, config: &SearchConfig, json: bool, stop_at: StopAt) -> Result<i32> {
    let request = PipelineRequest {
        stop_at: stop_at.into(),
        ..PipelineRequest::new(query, base_dir, config, 4000)
    };

    let result = match retrieve(&request).await {
        Ok(result) => result,
        Err(Error::LanguageMismatch { query_lang, corpus_lang, suggestion }) => {
            eprintln!(
                "{} query is {query_lang}, corpus is {corpus_lang}. {suggestion}",
                "Language mismatch:".red().bold()
            );
            return Ok(EXIT_LANGUAGE_MISMATCH);
        },
        Err(Error::Llm(message)) => {
            eprintln!("{} {message}", "LLM failure:".red().bold());
            return Ok(EXIT_LLM_FAILURE);
        },
        Err(err) => return Err(err).context("retrieval pipeline failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.output);
    }

    Ok(if result.success { EXIT_SUCCESS } else { EXIT_NO_RESULTS })
}

/// Validate a config file/inline JSON, printing every violation.
pub fn validate_config(source: &str) -> Result<i32> {
    let config = SearchConfig::load(source).context("failed to load config")?;
    let errors = config.validate();
    if errors.is_empty() {
        println!("{}", "Configuration is valid.".green());
        Ok(EXIT_SUCCESS)
    } else {
        for error in &errors {
            eprintln!("{} {error}", "error:".red().bold());
        }
        Ok(EXIT_NO_RESULTS)
    }
}

/// List doc-sets discovered under `base_dir`.
pub fn list_doc_sets(base_dir: &Path) -> Result<i32> {
    let doc_sets = docrag_core::corpus::discover_doc_sets(base_dir).context("failed to scan base directory")?;
    if doc_sets.is_empty() {
        println!("No doc-sets found under {}.", base_dir.display());
        return Ok(EXIT_NO_RESULTS);
    }
    for doc_set in doc_sets {
        println!("{}", doc_set.name);
    }
    Ok(EXIT_SUCCESS)
}
