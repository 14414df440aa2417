//! FALLBACK_1: regex recall over `docTOC.md` lines.
//!
//! The simpler of the two fallback strategies: build a
//! case-insensitive `OR` regex of `domain_nouns` and scan TOC lines for
//! matches, emitting `(page, heading)` pairs with no surrounding context
//! (FALLBACK_2 owns context extraction).

use crate::corpus::toc_source;
use crate::error::Result;
use crate::heading::parse_heading_line;
use crate::types::{DocSet, Page};
use regex::RegexBuilder;

/// A single FALLBACK_1 hit: a heading matched in a page's TOC.
#[derive(Debug, Clone)]
pub struct Fallback1Hit {
    /// Page the heading belongs to.
    pub page_title: String,
    /// Matched heading text.
    pub heading_text: String,
    /// Matched heading level.
    pub heading_level: u8,
}

/// Build the case-insensitive `domain_nouns` OR-regex used by both fallback
/// strategies. Returns `None` if `domain_nouns` is empty.
#[must_use]
pub fn domain_noun_pattern(domain_nouns: &[String]) -> Option<regex::Regex> {
    if domain_nouns.is_empty() {
        return None;
    }
    let alternation = domain_nouns
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Scan every page's TOC (or content file, if it has no TOC) for
/// `domain_noun` matches, one hit per matching heading line.
///
/// # Errors
///
/// Returns [`Error::Io`] if a page's TOC/content file can't be read.
pub fn search(_doc_set: &DocSet, pages: &[Page], domain_nouns: &[String]) -> Result<Vec<(Page, Fallback1Hit)>> {
    let Some(pattern) = domain_noun_pattern(domain_nouns) else {
        return Ok(Vec::new());
    };

    let mut hits = Vec::new();
    for page in pages {
        let path = toc_source(page);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => continue,
        };
        for line in content.lines() {
            if !pattern.is_match(line) {
                continue;
            }
            let Some(parsed) = parse_heading_line(line) else {
                continue;
            };
            hits.push((
                page.clone(),
                Fallback1Hit {
                    page_title: page.title.clone(),
                    heading_text: parsed.text,
                    heading_level: parsed.level,
                },
            ));
        }
    }
    Ok(hits)
}
