//! Error types and handling for docrag-core operations.
//!
//! All public functions in docrag-core return [`Result<T>`] for consistent error
//! handling. Errors confined to a single collaborator (an LLM call, an embedding
//! call) are meant to be caught by the calling stage and degrade gracefully —
//! only I/O and language-mismatch failures are meant to abort a request
//! outright.

use thiserror::Error;

/// The main error type for docrag-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File system operation failed (reading a corpus file, a config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP request to a Matcher backend or LLM endpoint failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Markdown/TOC content could not be parsed into the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The corpus on disk is missing an expected doc-set or page directory.
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Configuration is invalid (out-of-range threshold, unknown enum value, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query and corpus languages disagree (the single fatal validation error
    /// in the search path / §7).
    #[error("Language mismatch: query is {query_lang}, corpus is {corpus_lang}. {suggestion}")]
    LanguageMismatch {
        /// Detected dominant language of the query.
        query_lang: String,
        /// Detected dominant language of the sampled corpus.
        corpus_lang: String,
        /// A corrective action the caller can take.
        suggestion: String,
    },

    /// An embedding Matcher backend failed irrecoverably for this request.
    #[error("Matcher error: {0}")]
    Matcher(String),

    /// An LLM invocation failed or returned content that could not be parsed.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Requested resource (doc-set, page, heading) was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A top-level deadline was exceeded; the caller should treat the partial
    /// result as `success = false`.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catch-all for errors that don't fit another category.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Returns `true` for errors a caller might reasonably retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) | Self::Matcher(_) | Self::Llm(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Returns a short category string, useful for logging/metrics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Corpus(_) => "corpus",
            Self::Config(_) => "config",
            Self::LanguageMismatch { .. } => "language_mismatch",
            Self::Matcher(_) => "matcher",
            Self::Llm(_) => "llm",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }

    /// Whether this error should abort the whole request (policy:
    /// single-point-of-failure errors abort; LLM/matcher errors degrade).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Corpus(_) | Self::LanguageMismatch { .. } | Self::Config(_)
        )
    }
}

/// Convenience alias used throughout docrag-core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(Error::Timeout("slow".into()).is_recoverable());
        assert!(Error::Matcher("503".into()).is_recoverable());
        assert!(!Error::Parse("bad heading".into()).is_recoverable());
    }

    #[test]
    fn fatal_errors() {
        assert!(Error::Corpus("no doc-sets".into()).is_fatal());
        assert!(
            !Error::Llm("malformed json".into()).is_fatal(),
            "LLM failures should degrade, not abort"
        );
    }

    #[test]
    fn category_labels() {
        assert_eq!(Error::Parse("x".into()).category(), "parse");
        assert_eq!(
            Error::LanguageMismatch {
                query_lang: "en".into(),
                corpus_lang: "zh".into(),
                suggestion: "pick a matching doc-set".into(),
            }
            .category(),
            "language_mismatch"
        );
    }
}
