//! Reader: load Markdown content for selected pages, either
//! whole files or sliced to specific heading sections.

use crate::corpus::discover_pages;
use crate::error::Result;
use crate::heading::parse_atx_heading;
use crate::types::{DocSet, ExtractionResult};
use std::collections::HashMap;

/// One requested section: a page plus the headings to extract from it
/// (empty means "the whole file").
#[derive(Debug, Clone)]
pub struct SectionRequest {
    /// Doc-set the page belongs to.
    pub doc_set: DocSet,
    /// Page title to extract from.
    pub title: String,
    /// Heading texts to slice out; empty extracts the whole file.
    pub headings: Vec<String>,
}

/// Load the entire `docContent.md` for each of `titles` within `doc_set`.
///
/// # Errors
///
/// Returns an error if page discovery or a file read fails.
pub fn extract_by_titles(doc_set: &DocSet, titles: &[String], threshold: usize) -> Result<ExtractionResult> {
    let pages = discover_pages(doc_set)?;
    let mut contents = HashMap::new();

    for title in titles {
        if let Some(page) = pages.iter().find(|p| &p.title == title) {
            if let Ok(text) = std::fs::read_to_string(&page.content_path) {
                contents.insert(title.clone(), text);
            }
        }
    }

    Ok(ExtractionResult::new(contents, threshold))
}

/// Load sub-regions sliced at heading boundaries across potentially many
/// pages and doc-sets.
///
/// For each [`SectionRequest`], when `headings` is non-empty, each named
/// heading's sub-region runs from its own line up to (but excluding) the
/// next heading at the same or shallower level; when `headings` is empty,
/// the whole file is included. Multiple headings for the same page are
/// concatenated in request order, separated by a blank line.
///
/// # Errors
///
/// Returns an error if page discovery or a file read fails.
pub fn extract_multi_by_headings(sections: &[SectionRequest], threshold: usize) -> Result<ExtractionResult> {
    let mut contents = HashMap::new();

    for section in sections {
        let pages = discover_pages(&section.doc_set)?;
        let Some(page) = pages.iter().find(|p| p.title == section.title) else {
            continue;
        };
        let Ok(text) = std::fs::read_to_string(&page.content_path) else {
            continue;
        };

        let key = format!("{}::{}", section.doc_set.name, section.title);
        if section.headings.is_empty() {
            contents.insert(key, text);
            continue;
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut extracted_sections = Vec::new();
        for heading_text in &section.headings {
            if let Some(slice) = slice_section(&lines, heading_text) {
                extracted_sections.push(slice);
            }
        }
        if !extracted_sections.is_empty() {
            contents.insert(key, extracted_sections.join("\n\n"));
        }
    }

    Ok(ExtractionResult::new(contents, threshold))
}

/// Find `heading_text` among `lines`' ATX headings and slice from that line
/// up to (excluding) the next heading at the same or shallower level.
fn slice_section(lines: &[&str], heading_text: &str) -> Option<String> {
    let (start, level) = lines.iter().enumerate().find_map(|(idx, line)| {
        let parsed = parse_atx_heading(line)?;
        (parsed.text == heading_text).then_some((idx, parsed.level))
    })?;

    let end = lines[start + 1..]
        .iter()
        .position(|line| parse_atx_heading(line).is_some_and(|h| h.level <= level))
        .map_or(lines.len(), |rel| start + 1 + rel);

    Some(lines[start..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_doc_set(tmp: &TempDir, pages: &[(&str, &str)]) -> DocSet {
        let doc_dir = tmp.path().join("Docs@1.0");
        for (page_dir, content) in pages {
            let dir = doc_dir.join(page_dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("docContent.md"), content).unwrap();
        }
        DocSet { name: "Docs@1.0".to_string(), path: doc_dir }
    }

    #[test]
    fn extract_by_titles_loads_whole_file() {
        let tmp = TempDir::new().unwrap();
        let doc_set = make_doc_set(&tmp, &[("install", "# Install\n\nSteps go here.\n")]);
        let result = extract_by_titles(&doc_set, &["Install".to_string()], 1000).unwrap();
        assert_eq!(result.document_count, 1);
        assert!(result.contents["Install"].contains("Steps go here"));
        assert!(!result.requires_processing);
    }

    #[test]
    fn extract_multi_by_headings_slices_to_next_same_level() {
        let tmp = TempDir::new().unwrap();
        let content = "# Install\n\n## Step One\n\nDo this.\n\n## Step Two\n\nDo that.\n";
        let doc_set = make_doc_set(&tmp, &[("install", content)]);
        let sections = vec![SectionRequest {
            doc_set: doc_set.clone(),
            title: "Install".to_string(),
            headings: vec!["Step One".to_string()],
        }];
        let result = extract_multi_by_headings(&sections, 1000).unwrap();
        let key = "Docs@1.0::Install";
        assert!(result.contents[key].contains("Do this."));
        assert!(!result.contents[key].contains("Do that."));
    }

    #[test]
    fn empty_headings_list_includes_whole_file() {
        let tmp = TempDir::new().unwrap();
        let content = "# Install\n\n## Step One\n\nDo this.\n";
        let doc_set = make_doc_set(&tmp, &[("install", content)]);
        let sections = vec![SectionRequest { doc_set, title: "Install".to_string(), headings: Vec::new() }];
        let result = extract_multi_by_headings(&sections, 1000).unwrap();
        assert!(result.contents["Docs@1.0::Install"].contains("Do this."));
    }

    #[test]
    fn requires_processing_when_over_threshold() {
        let tmp = TempDir::new().unwrap();
        let content = "# Page\n".to_string() + &"line\n".repeat(50);
        let doc_set = make_doc_set(&tmp, &[("page", &content)]);
        let result = extract_by_titles(&doc_set, &["Page".to_string()], 10).unwrap();
        assert!(result.requires_processing);
    }
}
