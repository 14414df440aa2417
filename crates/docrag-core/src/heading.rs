//! Heading and TOC-line parsing.
//!
//! A doc-set page's `docTOC.md` is a flat list of headings and/or Markdown
//! list items; `docContent.md` is ordinary Markdown with ATX (`#`) headings.
//! This module turns a single line of either file into a [`ParsedHeading`]
//! (level + cleaned display text), stripping the Markdown-link and inline
//! HTML anchor markup real crawlers leave behind (e.g. `[Overview](#overview)`
//! or `<a id="overview"></a>Overview`), as well as the bare anchor-URL suffix
//! a `docTOC.md` line carries instead of a Markdown link (e.g.
//! `"1. Overview：https://example.com/docs#overview"`).

use html_escape::decode_html_entities;
use regex::Regex;
use std::sync::LazyLock;

/// Matches a TOC line's trailing anchor URL, introduced by either a
/// full-width colon (`：`) with no space or an ASCII colon with one space.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ANCHOR_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(：https?://\S+|: https?://\S+)").unwrap());

/// A heading or list-item line, reduced to its level and display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeading {
    /// Heading level: 1-6 for ATX headings, 4 for TOC list items (per GLOSSARY).
    pub level: u8,
    /// Cleaned, displayable heading text.
    pub text: String,
}

/// Parse a single ATX heading line (`# Title`, `## Title`, ...).
///
/// Returns `None` if the line isn't a heading, or the heading text is empty
/// after stripping markup.
#[must_use]
pub fn parse_atx_heading(line: &str) -> Option<ParsedHeading> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].trim_start();
    if rest.is_empty() || trimmed.as_bytes().get(hashes).is_some_and(|&b| b == b'#') {
        return None;
    }
    let text = clean_heading_text(rest);
    if text.is_empty() {
        return None;
    }
    Some(ParsedHeading {
        level: u8::try_from(hashes).unwrap_or(6),
        text,
    })
}

/// Parse a single Markdown list-item TOC line (`- [Title](#anchor)` or `- Title`).
///
/// List items are always assigned level 4 (GLOSSARY: "Heading: ... or 4 for
/// list items"), since TOC list nesting doesn't reliably map to heading depth.
#[must_use]
pub fn parse_toc_list_item(line: &str) -> Option<ParsedHeading> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))?;
    let text = clean_heading_text(rest);
    if text.is_empty() {
        return None;
    }
    Some(ParsedHeading { level: 4, text })
}

/// Parse a line as either an ATX heading or a TOC list item, in that order.
#[must_use]
pub fn parse_heading_line(line: &str) -> Option<ParsedHeading> {
    parse_atx_heading(line).or_else(|| parse_toc_list_item(line))
}

/// Strip Markdown link/anchor markup, a trailing TOC anchor-URL suffix, and
/// decode HTML entities from a raw heading segment, leaving only its display
/// text.
///
/// - `[Label](url)` collapses to `Label`.
/// - `<a ...>`/`</a>` tags are removed (their inner text, if any, is kept).
/// - A trailing `：https://...` or `: https://...` anchor URL is removed, so
///   a `docTOC.md` line's heading text matches the same heading's plain text
///   in `docContent.md`.
/// - HTML entities (`&amp;`, `&#39;`, ...) are decoded.
#[must_use]
pub fn clean_heading_text(raw: &str) -> String {
    let without_anchor_url = ANCHOR_URL_RE.replace_all(raw, "");
    let stripped = strip_links_and_anchors(&without_anchor_url);
    decode_html_entities(&stripped).trim().to_string()
}

fn strip_links_and_anchors(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                if let Some((label_end, link_end)) = find_markdown_link(bytes, i) {
                    output.push_str(&input[i + 1..label_end]);
                    i = link_end + 1;
                    continue;
                }
                output.push('[');
                i += 1;
            },
            b'<' => {
                if let Some(rel_gt) = input[i + 1..].find('>') {
                    let next_gt = i + 1 + rel_gt;
                    let tag = input[i + 1..next_gt].trim().to_ascii_lowercase();
                    if tag.starts_with("a ") || tag.starts_with("a>") || tag.starts_with("/a") {
                        i = next_gt + 1;
                        continue;
                    }
                }
                output.push('<');
                i += 1;
            },
            b if b.is_ascii() => {
                output.push(b as char);
                i += 1;
            },
            _ => {
                // Multi-byte UTF-8 sequence: copy the whole character.
                let ch_len = utf8_char_len(bytes[i]);
                output.push_str(&input[i..i + ch_len]);
                i += ch_len;
            },
        }
    }

    output
}

const fn utf8_char_len(lead_byte: u8) -> usize {
    if lead_byte & 0xE0 == 0xC0 {
        2
    } else if lead_byte & 0xF0 == 0xE0 {
        3
    } else if lead_byte & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

fn find_markdown_link(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b']' => {
                if idx + 1 < bytes.len() && bytes[idx + 1] == b'(' {
                    if let Some(close_paren) = find_matching_paren(bytes, idx + 2) {
                        return Some((idx, close_paren));
                    }
                }
                return None;
            },
            _ => idx += 1,
        }
    }
    None
}

fn find_matching_paren(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let mut depth = 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_atx_levels() {
        assert_eq!(
            parse_atx_heading("## Getting Started"),
            Some(ParsedHeading {
                level: 2,
                text: "Getting Started".to_string(),
            })
        );
        assert_eq!(parse_atx_heading("Not a heading"), None);
        assert_eq!(parse_atx_heading("####### too deep"), None);
    }

    #[test]
    fn atx_heading_strips_markdown_link() {
        let parsed = parse_atx_heading("# [Overview](./overview.md)").unwrap();
        assert_eq!(parsed.text, "Overview");
    }

    #[test]
    fn toc_list_item_is_level_four() {
        let parsed = parse_toc_list_item("- [Installing](#installing)").unwrap();
        assert_eq!(parsed.level, 4);
        assert_eq!(parsed.text, "Installing");
    }

    #[test]
    fn strips_inline_anchor_tags() {
        let cleaned = clean_heading_text(r#"<a id="overview"></a>Overview"#);
        assert_eq!(cleaned, "Overview");
    }

    #[test]
    fn decodes_html_entities() {
        assert_eq!(clean_heading_text("Foo &amp; Bar"), "Foo & Bar");
    }

    #[test]
    fn preserves_cjk_text() {
        let parsed = parse_atx_heading("# 快速开始").unwrap();
        assert_eq!(parsed.text, "快速开始");
    }

    #[test]
    fn empty_heading_after_cleanup_is_none() {
        assert_eq!(parse_atx_heading("# [](#anchor)"), None);
    }

    #[test]
    fn strips_toc_anchor_url_full_width_colon() {
        let parsed = parse_atx_heading("## 1. Title：https://example.com/page#anchor").unwrap();
        assert_eq!(parsed.text, "1. Title");
    }

    #[test]
    fn strips_toc_anchor_url_ascii_colon() {
        let cleaned = clean_heading_text("1. Title: https://example.com/page#anchor");
        assert_eq!(cleaned, "1. Title");
    }
}
