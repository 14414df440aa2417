//! FALLBACK_2: regex recall over `docContent.md` lines, with context.
//!
//! The richer of the two fallback strategies. Where FALLBACK_1
//! only reports which headings matched, FALLBACK_2 also carries a
//! surrounding-context snippet for each hit, built by the symmetric-growth
//! algorithm below.

use crate::error::Result;
use crate::fallback1::domain_noun_pattern;
use crate::heading::parse_atx_heading;
use crate::types::Page;
use std::collections::HashSet;

/// A single FALLBACK_2 hit: a heading whose section contains a matching
/// line, plus the extracted context snippet.
#[derive(Debug, Clone)]
pub struct Fallback2Hit {
    /// Page the heading belongs to.
    pub page_title: String,
    /// The backtracked section heading text.
    pub heading_text: String,
    /// Heading level (1-6).
    pub heading_level: u8,
    /// Extracted context snippet around the match.
    pub related_context: String,
}

const BACKTRACK_LIMIT: usize = 100;
const INITIAL_RADIUS: usize = 2;
const GROWTH_STEP: usize = 5;
const MAX_RADIUS: usize = 50;
const MAX_WORDS: usize = 80;

/// Scan every page's `docContent.md` for `domain_noun` matches, backtrack to
/// the enclosing heading, and extract a context window. Stops early once
/// `max_results` hits have been collected across the whole doc-set.
///
/// # Errors
///
/// Returns [`Error::Io`] if a page's content file can't be read.
pub fn search(pages: &[Page], domain_nouns: &[String], max_results: usize) -> Result<Vec<Fallback2Hit>> {
    let Some(pattern) = domain_noun_pattern(domain_nouns) else {
        return Ok(Vec::new());
    };

    let mut hits = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    'pages: for page in pages {
        let Ok(content) = std::fs::read_to_string(&page.content_path) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();

        for (idx, line) in lines.iter().enumerate() {
            if !pattern.is_match(line) {
                continue;
            }
            let Some((heading_idx, heading_level, heading_text)) = backtrack_heading(&lines, idx) else {
                continue;
            };
            let key = (page.title.clone(), heading_text.clone());
            if !seen.insert(key) {
                continue;
            }

            let context = extract_context(&lines, idx, heading_idx);
            hits.push(Fallback2Hit {
                page_title: page.title.clone(),
                heading_text,
                heading_level,
                related_context: context,
            });

            if hits.len() >= max_results {
                break 'pages;
            }
        }
    }

    Ok(hits)
}

fn backtrack_heading(lines: &[&str], match_idx: usize) -> Option<(usize, u8, String)> {
    let start = match_idx.saturating_sub(BACKTRACK_LIMIT);
    for i in (start..=match_idx).rev() {
        if let Some(parsed) = parse_atx_heading(lines[i]) {
            return Some((i, parsed.level, parsed.text));
        }
    }
    None
}

/// Extract a context window around `match_idx`, excluding the heading line
/// itself and any line immediately following it that's a bare `---` rule.
///
/// Grows symmetrically from `±2` to `±50` lines in steps of 5 while the word
/// count stays at or under 80. If the final window still exceeds the word
/// budget, it's trimmed from both ends toward the center — the match line at
/// `match_idx` is never dropped (see DESIGN.md for why this matters).
fn extract_context(lines: &[&str], match_idx: usize, heading_idx: usize) -> String {
    let content_floor = heading_idx + 1;
    let mut radius = INITIAL_RADIUS;

    loop {
        let lo = match_idx.saturating_sub(radius).max(content_floor);
        let hi = (match_idx + radius).min(lines.len().saturating_sub(1));
        let window = collect_window(lines, lo, hi);
        let word_count = count_words(&window);

        if word_count <= MAX_WORDS || radius >= MAX_RADIUS {
            return if word_count <= MAX_WORDS {
                window.join("\n")
            } else {
                truncate_to_word_budget(&window, match_idx.saturating_sub(lo))
            };
        }
        radius += GROWTH_STEP;
    }
}

fn collect_window<'a>(lines: &[&'a str], lo: usize, hi: usize) -> Vec<&'a str> {
    lines[lo..=hi.max(lo)]
        .iter()
        .copied()
        .filter(|l| l.trim() != "---")
        .collect()
}

fn count_words(lines: &[&str]) -> usize {
    lines.iter().map(|l| l.split_whitespace().count()).sum()
}

/// Trim a window to the word budget by dropping whole lines alternately from
/// the front and back, pinning the line at `match_offset` so it's never
/// removed.
fn truncate_to_word_budget(window: &[&str], match_offset: usize) -> String {
    let mut front = 0usize;
    let mut back = window.len();
    let match_offset = match_offset.min(window.len().saturating_sub(1));

    loop {
        let current_words = count_words(&window[front..back]);
        if current_words <= MAX_WORDS || back.saturating_sub(front) <= 1 {
            break;
        }
        if back - 1 > match_offset && back - front > 1 {
            back -= 1;
        } else if front < match_offset {
            front += 1;
        } else {
            break;
        }
    }

    window[front..back].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn page_with_content(dir: &std::path::Path, content: &str) -> Page {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("docContent.md"), content).unwrap();
        Page {
            title: "Page".to_string(),
            dir: dir.to_path_buf(),
            content_path: dir.join("docContent.md"),
            toc_path: None,
        }
    }

    #[test]
    fn finds_match_and_backtracks_to_heading() {
        let tmp = TempDir::new().unwrap();
        let content = "# Intro\n\nSome filler.\n\n## Transcripts\n\nYou can export a transcript here.\n\nMore text.";
        let page = page_with_content(tmp.path(), content);
        let hits = search(&[page], &["transcript".to_string()], 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].heading_text, "Transcripts");
        assert!(hits[0].related_context.contains("export a transcript"));
    }

    #[test]
    fn dedups_by_page_and_heading() {
        let tmp = TempDir::new().unwrap();
        let content = "## Transcripts\n\ntranscript one\n\ntranscript two\n";
        let page = page_with_content(tmp.path(), content);
        let hits = search(&[page], &["transcript".to_string()], 20).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn respects_max_results_across_pages() {
        let tmp = TempDir::new().unwrap();
        let mut pages = Vec::new();
        for i in 0..5 {
            let dir = tmp.path().join(format!("page-{i}"));
            pages.push(page_with_content(&dir, &format!("## Heading {i}\n\ntranscript match\n")));
        }
        let hits = search(&pages, &["transcript".to_string()], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn no_match_with_no_enclosing_heading_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let content = "transcript mentioned with no heading above it\n";
        let page = page_with_content(tmp.path(), content);
        let hits = search(&[page], &["transcript".to_string()], 20).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn long_section_truncates_without_dropping_match_line() {
        let tmp = TempDir::new().unwrap();
        let mut content = String::from("## Transcripts\n\n");
        for i in 0..40 {
            content.push_str(&format!("filler line number {i} with several words in it\n"));
        }
        content.push_str("this line has the transcript keyword in it\n");
        for i in 0..40 {
            content.push_str(&format!("trailing filler line number {i} words words\n"));
        }
        let page = page_with_content(tmp.path(), &content);
        let hits = search(&[page], &["transcript".to_string()], 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].related_context.contains("has the transcript keyword"));
    }
}
