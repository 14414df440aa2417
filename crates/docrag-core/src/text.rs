//! Text normalization, tokenization, and reranker preprocessing.
//!
//! Two independent concerns share this module because they're both defined
//! in terms of the same CJK/ASCII split: BM25's tokenizer (§4.1) and the
//! verb-stripping preprocessing pass that runs before embedding/LLM rerank
//! (§4.3). Keeping them together avoids duplicating the CJK-detection logic.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `true` if `ch` falls in the CJK Unified Ideographs block (U+4E00-U+9FFF).
#[must_use]
pub const fn is_cjk(ch: char) -> bool {
    matches!(ch as u32, 0x4E00..=0x9FFF)
}

/// Fraction of non-whitespace characters in `text` that are CJK ideographs.
///
/// Used both by the language-consistency guard and by [`crate::matcher`]'s
/// model-selection rule; both apply the same 90% threshold to
/// the aggregate of all texts under consideration.
#[must_use]
pub fn cjk_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        total += 1;
        if is_cjk(ch) {
            cjk += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        f64::from(u32::try_from(cjk).unwrap_or(u32::MAX)) / f64::from(u32::try_from(total).unwrap_or(u32::MAX))
    }
}

/// Tokenize text for BM25 scoring: lowercase, split on non-alphanumeric runs;
/// each CJK character becomes its own token.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if is_cjk(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn ascii_stem(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if let Some(stem) = lower.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = lower.strip_suffix("ves") {
        format!("{stem}f")
    } else if let Some(stem) = lower.strip_suffix("ied") {
        format!("{stem}y")
    } else if let Some(stem) = lower.strip_suffix("es") {
        stem.to_string()
    } else if let Some(stem) = lower.strip_suffix('s') {
        stem.to_string()
    } else {
        lower
    }
}

/// Whether `text` contains at least one of `domain_nouns`:
/// CJK nouns match by substring, ASCII nouns match by stemmed-suffix
/// equality against each word in `text`.
#[must_use]
pub fn contains_domain_noun(text: &str, domain_nouns: &[String]) -> bool {
    domain_nouns.iter().any(|noun| {
        if noun.chars().any(is_cjk) {
            text.contains(noun.as_str())
        } else {
            let noun_stem = ascii_stem(noun);
            text.split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .any(|word| ascii_stem(word) == noun_stem)
        }
    })
}

static WORD_BOUNDARY_CACHE: Lazy<std::sync::Mutex<std::collections::HashMap<String, Regex>>> =
    Lazy::new(|| std::sync::Mutex::new(std::collections::HashMap::new()));

fn word_boundary_regex(verb: &str) -> Option<Regex> {
    let mut cache = WORD_BOUNDARY_CACHE.lock().ok()?;
    if let Some(re) = cache.get(verb) {
        return Some(re.clone());
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(verb));
    let re = Regex::new(&pattern).ok()?;
    cache.insert(verb.to_string(), re.clone());
    Some(re)
}

/// Strip every `predicate_verb` from `text`, skipping any verb present in
/// `protected`.
///
/// ASCII verbs are removed at word boundaries, case-insensitively; CJK verbs
/// are removed by bare substring replacement (CJK text has no word
/// boundaries to anchor on). Whitespace is collapsed and the result trimmed.
#[must_use]
pub fn strip_predicate_verbs(text: &str, predicate_verbs: &[String], protected: &HashSet<String>) -> String {
    let mut result = text.to_string();
    for verb in predicate_verbs {
        if protected.contains(verb) {
            continue;
        }
        if verb.chars().any(is_cjk) {
            result = result.replace(verb.as_str(), " ");
        } else if let Some(re) = word_boundary_regex(verb) {
            result = re.replace_all(&result, " ").into_owned();
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply the full reranker preprocessing rule to a single heading/page-title
/// string: texts anchored by a `domain_noun` pass through
/// byte-identical; texts with no anchoring noun have predicate verbs
/// stripped (protected verbs excepted).
#[must_use]
pub fn preprocess(
    text: &str,
    domain_nouns: &[String],
    predicate_verbs: &[String],
    protected: &HashSet<String>,
) -> String {
    if contains_domain_noun(text, domain_nouns) {
        text.to_string()
    } else {
        strip_predicate_verbs(text, predicate_verbs, protected)
    }
}

/// Compute `protected = skiped_keywords ∩ domain_nouns`, case-sensitively
/// (both lists are assumed already normalized by the caller).
#[must_use]
pub fn protected_keywords(skiped_keywords: &[String], domain_nouns: &[String]) -> HashSet<String> {
    let domain_set: HashSet<&str> = domain_nouns.iter().map(String::as_str).collect();
    skiped_keywords
        .iter()
        .filter(|k| domain_set.contains(k.as_str()))
        .cloned()
        .collect()
}
