//! Command-line interface definition for `docrag`.
//!
//! A bare query string runs the full pipeline, while named subcommands
//! expose debugging (`search --stop-at`), config validation, and doc-set
//! listing.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// `docrag` - local Doc-RAG retrieval over pre-crawled Markdown documentation sets.
#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(version)]
#[command(about = "Local Doc-RAG retrieval over pre-crawled Markdown documentation sets", long_about = None)]
#[command(override_usage = "docrag [COMMAND] [ARGS]...\n       docrag \"<query>\" --base-dir <path>")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Query text used when no explicit subcommand is given.
    #[arg(value_name = "QUERY", trailing_var_arg = true)]
    pub query: Vec<String>,

    /// Base directory holding `<name>@<version>` doc-set directories.
    #[arg(long, global = true, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Path to a JSON/TOML config file, or an inline `{...}` JSON object.
    #[arg(long, global = true, value_name = "PATH_OR_JSON")]
    pub config: Option<String>,

    /// Emit the raw `SearchResult`/`DocRagResult` as JSON instead of formatted Markdown.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Explicit subcommands beyond the default query action.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full retrieval pipeline (explicit form of the default action).
    Query {
        /// The natural-language question.
        query: String,
    },
    /// Run the pipeline and stop early at a given phase, for debugging.
    Search {
        /// The natural-language question.
        query: String,
        /// Phase to stop at.
        #[arg(long, value_enum, default_value_t = StopAt::Phase4)]
        stop_at: StopAt,
    },
    /// Validate a configuration file or inline JSON object.
    ValidateConfig {
        /// Path to a config file, or an inline `{...}` JSON object.
        source: String,
    },
    /// List doc-sets discovered under `--base-dir`.
    DocSets,
}

/// CLI-facing mirror of [`docrag_core::StopAtPhase`] (clap needs `ValueEnum`,
/// which the core type deliberately doesn't derive to stay CLI-agnostic).
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopAt {
    /// Stop after query optimization (stage 0a).
    #[value(name = "0a")]
    Phase0a,
    /// Stop after scene routing (stage 0b).
    #[value(name = "0b")]
    Phase0b,
    /// Stop after search/recall/rerank (stage 1).
    #[value(name = "1")]
    Phase1,
    /// Stop after LLM reranking (stage 1.5).
    #[value(name = "1.5")]
    Phase1_5,
    /// Stop after content extraction (stage 2).
    #[value(name = "2")]
    Phase2,
    /// Run to completion (stage 4).
    #[value(name = "4")]
    Phase4,
}

impl From<StopAt> for docrag_core::StopAtPhase {
    fn from(value: StopAt) -> Self {
        match value {
            StopAt::Phase0a => Self::Phase0a,
            StopAt::Phase0b => Self::Phase0b,
            StopAt::Phase1 => Self::Phase1,
            StopAt::Phase1_5 => Self::Phase1_5,
            StopAt::Phase2 => Self::Phase2,
            StopAt::Phase4 => Self::Phase4,
        }
    }
}
