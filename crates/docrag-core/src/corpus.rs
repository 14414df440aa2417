//! Corpus discovery: finding doc-sets and pages on disk.
//!
//! A corpus is a base directory containing doc-set directories named
//! `<name>@<version>` (GLOSSARY). Each doc-set is a tree of page
//! directories, each holding `docContent.md` and optionally `docTOC.md`.

use crate::error::{Error, Result};
use crate::heading::parse_atx_heading;
use crate::types::{DocSet, Page};
use std::path::Path;

/// Discover every doc-set directly under `base_dir`.
///
/// A directory counts as a doc-set iff its name contains `@` (the
/// `<name>@<version>` convention). Non-matching entries (stray files,
/// `.git`, etc.) are silently skipped.
///
/// # Errors
///
/// Returns [`Error::Io`] if `base_dir` can't be read.
pub fn discover_doc_sets(base_dir: &Path) -> Result<Vec<DocSet>> {
    let mut doc_sets = Vec::new();
    for entry in std::fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains('@') {
            doc_sets.push(DocSet { name, path: entry.path() });
        }
    }
    doc_sets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(doc_sets)
}

/// Recursively discover every page (directory containing `docContent.md`)
/// under a doc-set.
///
/// # Errors
///
/// Returns [`Error::Io`] if the doc-set directory tree can't be walked.
pub fn discover_pages(doc_set: &DocSet) -> Result<Vec<Page>> {
    let mut pages = Vec::new();
    walk_pages(&doc_set.path, &mut pages)?;
    pages.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(pages)
}

fn walk_pages(dir: &Path, out: &mut Vec<Page>) -> Result<()> {
    let content_path = dir.join("docContent.md");
    if content_path.is_file() {
        let toc_path = dir.join("docTOC.md");
        let title = page_title(dir, &content_path)?;
        out.push(Page {
            title,
            dir: dir.to_path_buf(),
            content_path,
            toc_path: toc_path.is_file().then_some(toc_path),
        });
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            walk_pages(&entry.path(), out)?;
        }
    }
    Ok(())
}

/// Resolve a page's canonical title: the first `#` heading of
/// `docContent.md`, falling back to the page directory's name.
///
/// # Errors
///
/// Returns [`Error::Io`] if `content_path` can't be read.
pub fn page_title(dir: &Path, content_path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(content_path)?;
    for line in content.lines() {
        if let Some(heading) = parse_atx_heading(line) {
            if heading.level == 1 {
                return Ok(heading.text);
            }
        }
    }
    Ok(dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string()))
}

/// The effective TOC source for a page: its `docTOC.md` if present,
/// otherwise `docContent.md` itself (BM25 recall falls back to
/// scanning content headings when a page has no dedicated TOC).
#[must_use]
pub fn toc_source(page: &Page) -> &Path {
    page.toc_path.as_deref().unwrap_or(&page.content_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_page(dir: &Path, content: &str, toc: Option<&str>) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("docContent.md"), content).unwrap();
        if let Some(toc) = toc {
            fs::write(dir.join("docTOC.md"), toc).unwrap();
        }
    }

    #[test]
    fn discovers_doc_sets_by_at_sign_convention() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("React_Docs@19.0")).unwrap();
        fs::create_dir_all(tmp.path().join("not_a_doc_set")).unwrap();
        let found = discover_doc_sets(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "React_Docs@19.0");
    }

    #[test]
    fn discovers_nested_pages() {
        let tmp = TempDir::new().unwrap();
        let ds_dir = tmp.path().join("Docs@1.0");
        write_page(&ds_dir.join("intro"), "# Introduction\n\nHello.", Some("- [Introduction](#introduction)"));
        write_page(&ds_dir.join("guides").join("setup"), "# Setup Guide\n\nSteps.", None);

        let doc_set = DocSet { name: "Docs@1.0".to_string(), path: ds_dir };
        let pages = discover_pages(&doc_set).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().any(|p| p.title == "Introduction"));
        assert!(pages.iter().any(|p| p.title == "Setup Guide" && p.toc_path.is_none()));
    }

    #[test]
    fn falls_back_to_directory_name_without_h1() {
        let tmp = TempDir::new().unwrap();
        let page_dir = tmp.path().join("untitled-page");
        write_page(&page_dir, "Some text with no heading.", None);
        let title = page_title(&page_dir, &page_dir.join("docContent.md")).unwrap();
        assert_eq!(title, "untitled-page");
    }
}
