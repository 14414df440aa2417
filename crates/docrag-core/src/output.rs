//! SceneOutput: deterministically format the final
//! answer given `{query, scene, contents, doc_metas}`. Every scene shares
//! the same `Sources` block; they differ in section ordering, citation
//! verbosity, and whether quotes are verbatim or paraphrased.

use crate::types::{Scene, SourceMeta};
use std::collections::HashMap;

/// Everything [`render`] needs to build the final Markdown answer.
#[derive(Debug, Clone)]
pub struct OutputRequest<'a> {
    /// The original user query.
    pub query: &'a str,
    /// The classified scene, driving template choice.
    pub scene: Scene,
    /// Extracted content, keyed by title (matches [`crate::types::ExtractionResult::contents`]).
    pub contents: &'a HashMap<String, String>,
    /// Source metadata, in citation order; index `i` is cited as `[i+1]`.
    pub sources: &'a [SourceMeta],
    /// Set when upstream compression ran on `contents` (changes a disclosure line).
    pub compression_applied: bool,
}

/// Render the final Markdown answer for `request`.
#[must_use]
pub fn render(request: &OutputRequest<'_>) -> String {
    let mut out = String::new();
    out.push_str(&scene_heading(request.scene));
    out.push_str("\n\n");

    if request.scene.requires_verbatim() {
        render_verbatim_body(request, &mut out);
    } else {
        render_synthesized_body(request, &mut out);
    }

    if request.compression_applied {
        out.push_str("\n_Note: source content was summarized to fit the context budget._\n");
    }

    out.push_str("\n## Sources\n\n");
    for (idx, source) in request.sources.iter().enumerate() {
        let citation = idx + 1;
        match &source.source_url {
            Some(url) => out.push_str(&format!("{citation}. [{}]({}) — `{}`\n", source.title, url, source.local_path.display())),
            None => out.push_str(&format!("{citation}. {} — `{}`\n", source.title, source.local_path.display())),
        }
    }

    out
}

const fn scene_heading(scene: Scene) -> &'static str {
    match scene {
        Scene::FactLookup => "## Answer",
        Scene::FaithfulReference => "## Reference",
        Scene::FaithfulHowTo => "## Steps",
        Scene::ConceptLearning => "## Explanation",
        Scene::HowTo => "## How To",
        Scene::Comparison => "## Comparison",
        Scene::Exploration => "## Overview",
    }
}

/// Verbatim scenes (`FaithfulReference`, `FaithfulHowTo`) quote source
/// content unmodified inside fenced blocks, each tagged with its citation index.
fn render_verbatim_body(request: &OutputRequest<'_>, out: &mut String) {
    for (idx, source) in request.sources.iter().enumerate() {
        let Some(content) = request.contents.get(&source.title) else { continue };
        out.push_str(&format!("### {} [{}]\n\n```text\n{}\n```\n\n", source.title, idx + 1, content.trim_end()));
    }
}

/// Non-verbatim scenes synthesize a single narrative body, citing sources
/// inline by index; here (no LLM in the loop) that narrative is the
/// concatenation of every extracted section under its own heading, which a
/// downstream generator is expected to paraphrase from.
fn render_synthesized_body(request: &OutputRequest<'_>, out: &mut String) {
    out.push_str(&format!("_Query: {}_\n\n", request.query));
    for (idx, source) in request.sources.iter().enumerate() {
        let Some(content) = request.contents.get(&source.title) else { continue };
        out.push_str(&format!("### {} [{}]\n\n{}\n\n", source.title, idx + 1, content.trim_end()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(title: &str, url: Option<&str>) -> SourceMeta {
        SourceMeta { title: title.to_string(), source_url: url.map(str::to_string), local_path: PathBuf::from(format!("{title}.md")) }
    }

    #[test]
    fn faithful_how_to_renders_verbatim_fenced_block() {
        let mut contents = HashMap::new();
        contents.insert("Install".to_string(), "1. Run setup\n2. Restart".to_string());
        let sources = vec![source("Install", Some("https://docs.example/install"))];
        let request = OutputRequest {
            query: "how do I install this",
            scene: Scene::FaithfulHowTo,
            contents: &contents,
            sources: &sources,
            compression_applied: false,
        };
        let rendered = render(&request);
        assert!(rendered.starts_with("## Steps"));
        assert!(rendered.contains("```text\n1. Run setup\n2. Restart\n```"));
        assert!(rendered.contains("## Sources"));
        assert!(rendered.contains("[Install](https://docs.example/install)"));
    }

    #[test]
    fn exploration_renders_synthesized_body_with_query_line() {
        let mut contents = HashMap::new();
        contents.insert("Overview".to_string(), "This system does X.".to_string());
        let sources = vec![source("Overview", None)];
        let request = OutputRequest {
            query: "what is this",
            scene: Scene::Exploration,
            contents: &contents,
            sources: &sources,
            compression_applied: false,
        };
        let rendered = render(&request);
        assert!(rendered.starts_with("## Overview"));
        assert!(rendered.contains("_Query: what is this_"));
        assert!(rendered.contains("This system does X."));
    }

    #[test]
    fn compression_note_appended_when_flagged() {
        let contents = HashMap::new();
        let sources = Vec::new();
        let request = OutputRequest {
            query: "q",
            scene: Scene::FactLookup,
            contents: &contents,
            sources: &sources,
            compression_applied: true,
        };
        let rendered = render(&request);
        assert!(rendered.contains("summarized to fit the context budget"));
    }
}
