//! docrag CLI - local Doc-RAG retrieval over pre-crawled Markdown documentation.
//!
//! Argument parsing lives in [`cli`]; command bodies live in [`commands`].
//! [`run`] is the single entry point `main.rs` calls, returning the process
//! exit code rather than calling `std::process::exit` itself so
//! it stays testable.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, StopAt};
use docrag_core::SearchConfig;
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Parse arguments, dispatch to the matching command, and return the exit code.
///
/// # Errors
///
/// Returns an error for conditions not covered by the exit-code
/// contract (a malformed config file, an unreadable base directory, ...).
pub async fn run() -> Result<i32> {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base_dir = cli.base_dir.clone().unwrap_or_else(default_base_dir);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Query { query }) => {
            commands::run_query(&query, &base_dir, &config, cli.json, StopAt::Phase4).await
        },
        Some(Commands::Search { query, stop_at }) => {
            commands::run_query(&query, &base_dir, &config, cli.json, stop_at).await
        },
        Some(Commands::ValidateConfig { source }) => commands::validate_config(&source),
        Some(Commands::DocSets) => commands::list_doc_sets(&base_dir),
        None => {
            let query = cli.query.join(" ");
            if query.trim().is_empty() {
                eprintln!("Usage: docrag \"<query>\" --base-dir <path>");
                return Ok(commands::EXIT_NO_RESULTS);
            }
            commands::run_query(&query, &base_dir, &config, cli.json, StopAt::Phase4).await
        },
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .try_init();
}

fn default_base_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "docrag")
        .map(|dirs| dirs.data_dir().join("corpus"))
        .unwrap_or_else(|| PathBuf::from("./corpus"))
}

fn load_config(source: Option<&str>) -> Result<SearchConfig> {
    match source {
        Some(source) => Ok(SearchConfig::load(source)?),
        None => Ok(SearchConfig::default()),
    }
}
