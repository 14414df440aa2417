//! Language-consistency guard.
//!
//! Before running a search, the Searcher samples up to 5 `docTOC.md` files
//! per doc-set, detects the corpus's dominant script, detects the query's
//! dominant script, and fails fast if they disagree. This is deliberately
//! the *only* fatal validation error in the search path: a search against
//! the wrong corpus would silently return nothing useful rather than erroring.

use crate::error::{Error, Result};
use crate::text::cjk_ratio;
use crate::types::Page;

const SAMPLE_LIMIT: usize = 5;

/// A detected dominant script, coarse enough for the guard's purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// CJK-dominant text (≥90% CJK characters, see [`crate::text::cjk_ratio`]).
    Chinese,
    /// Everything else.
    Other,
}

impl Language {
    /// Detect the dominant script of a single text blob.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if cjk_ratio(text) >= 0.90 {
            Self::Chinese
        } else {
            Self::Other
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Chinese => "zh",
            Self::Other => "en",
        }
    }
}

/// Detect a doc-set's dominant language by sampling up to [`SAMPLE_LIMIT`]
/// `docTOC.md` files (falling back to `docContent.md` for pages without a
/// TOC) and aggregating their text before running [`Language::detect`].
///
/// Sampling is over `pages` in their discovery order, so this is stable
/// under the corpus's natural (path-sorted) ordering rather than sensitive
/// to incidental concatenation order.
///
/// # Errors
///
/// Returns [`Error::Io`] if a sampled file can't be read.
pub fn detect_corpus_language(pages: &[Page]) -> Result<Language> {
    let mut sample = String::new();
    for page in pages.iter().take(SAMPLE_LIMIT) {
        let path = page.toc_path.as_deref().unwrap_or(&page.content_path);
        if let Ok(content) = std::fs::read_to_string(path) {
            sample.push_str(&content);
            sample.push(' ');
        }
    }
    Ok(Language::detect(&sample))
}

/// Enforce the language-consistency guard for a single doc-set, returning a
/// fatal [`Error::LanguageMismatch`] if the query and corpus scripts disagree.
///
/// # Errors
///
/// Returns [`Error::Io`] if sampling fails, or [`Error::LanguageMismatch`] if
/// the detected languages disagree.
pub fn check_language_consistency(doc_set_name: &str, pages: &[Page], query: &str) -> Result<()> {
    let corpus_lang = detect_corpus_language(pages)?;
    let query_lang = Language::detect(query);

    if corpus_lang != query_lang {
        return Err(Error::LanguageMismatch {
            query_lang: query_lang.label().to_string(),
            corpus_lang: corpus_lang.label().to_string(),
            suggestion: format!(
                "doc-set '{doc_set_name}' appears to be {}; rephrase the query in that language or pick a matching doc-set",
                corpus_lang.label()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn toc_page(dir: &std::path::Path, toc: &str) -> Page {
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
    fn detects_chinese_corpus() {
        let tmp = TempDir::new().unwrap();
        let page = toc_page(tmp.path(), "- 快速开始\n- 安装指南\n- 配置说明");
        assert_eq!(detect_corpus_language(&[page]).unwrap(), Language::Chinese);
    }

    #[test]
    fn detects_english_corpus() {
        let tmp = TempDir::new().unwrap();
        let page = toc_page(tmp.path(), "- Getting Started\n- Installation\n- Configuration");
        assert_eq!(detect_corpus_language(&[page]).unwrap(), Language::Other);
    }

    #[test]
    fn mismatch_is_fatal_with_named_languages() {
        let tmp = TempDir::new().unwrap();
        let page = toc_page(tmp.path(), "- Getting Started\n- Installation\n- Configuration");
        let err = check_language_consistency("Docs@1.0", &[page], "如何安装这个软件").unwrap_err();
        match err {
            Error::LanguageMismatch { query_lang, corpus_lang, .. } => {
                assert_eq!(query_lang, "zh");
                assert_eq!(corpus_lang, "en");
            },
            other => panic!("expected LanguageMismatch, got {other:?}"),
        }
    }

    #[test]
    fn matching_languages_pass() {
        let tmp = TempDir::new().unwrap();
        let page = toc_page(tmp.path(), "- Getting Started\n- Installation");
        assert!(check_language_consistency("Docs@1.0", &[page], "how do I install this").is_ok());
    }

    #[test]
    fn stable_under_sample_concatenation_order() {
        let tmp = TempDir::new().unwrap();
        let page_a = toc_page(&tmp.path().join("a"), "- Getting Started");
        let page_b = toc_page(&tmp.path().join("b"), "- Installation");
        let forward = detect_corpus_language(&[page_a.clone(), page_b.clone()]).unwrap();
        let reversed = detect_corpus_language(&[page_b, page_a]).unwrap();
        assert_eq!(forward, reversed);
    }
}
