//! Triple-backtick-fenced JSON extraction:
//! LLM responses embed a JSON payload in a `` ```json ... ``` `` code block;
//! this pulls it out by substring search rather than a full Markdown parse.

use serde_json::Value;

const FENCE_MARKERS: [&str; 2] = ["```json", "```"];

/// Extract and parse the first fenced JSON block found in `text`.
///
/// Tries a `` ```json `` fence first, then a bare `` ``` `` fence. Returns
/// `None` if no fence is found or its contents don't parse as JSON.
#[must_use]
pub fn extract_json_from_codeblock(text: &str) -> Option<Value> {
    for marker in FENCE_MARKERS {
        if let Some(start) = text.find(marker) {
            let after_marker = start + marker.len();
            let body_start = text[after_marker..].find('\n').map_or(after_marker, |nl| after_marker + nl + 1);
            if let Some(end_offset) = text[body_start..].find("```") {
                let body = &text[body_start..body_start + end_offset];
                if let Ok(value) = serde_json::from_str(body.trim()) {
                    return Some(value);
                }
            }
        }
    }
    // Fall back to treating the whole text as JSON, in case the model
    // omitted fences entirely.
    serde_json::from_str(text.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_json_fenced_block() {
        let text = "Here is the result:\n```json\n{\"a\": 1}\n```\nDone.";
        let value = extract_json_from_codeblock(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extracts_from_bare_fenced_block() {
        let text = "```\n{\"b\": 2}\n```";
        let value = extract_json_from_codeblock(text).unwrap();
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn falls_back_to_whole_text_without_fences() {
        let text = "  {\"c\": 3}  ";
        let value = extract_json_from_codeblock(text).unwrap();
        assert_eq!(value["c"], 3);
    }

    #[test]
    fn returns_none_for_unparseable_text() {
        assert!(extract_json_from_codeblock("not json at all").is_none());
    }

    #[test]
    fn handles_nested_braces_inside_fence() {
        let text = "```json\n{\"a\": {\"b\": [1, 2, 3]}}\n```";
        let value = extract_json_from_codeblock(text).unwrap();
        assert_eq!(value["a"]["b"][1], 2);
    }
}
