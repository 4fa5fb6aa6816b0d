//! Version tokens and named-entity extraction from announcement text.
//!
//! Extraction is best-effort: no plausibility checks, callers decide what to
//! do with an empty result.

use once_cell::sync::Lazy;
use regex::Regex;

static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*버전").unwrap());

/// Extract a version label like `2.7` from `2.7 버전`.
pub fn extract_version(text: &str) -> Option<String> {
    VERSION.captures(text).map(|caps| caps[1].to_string())
}

static CORNER_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"「([^」]+)」").unwrap());

/// All names enclosed in Korean corner brackets, in order of appearance.
pub fn corner_bracket_names(text: &str) -> Vec<String> {
    CORNER_BRACKET
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

// Banner posts write 「이름(파벌)」; the open paren cuts off the affiliation.
static CORNER_BRACKET_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"「([^」]+?)\(").unwrap());

/// Character names written as `「name(affiliation)」`, deduplicated while
/// preserving first-seen order.
pub fn corner_bracket_names_before_paren(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in CORNER_BRACKET_PAREN.captures_iter(text) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

static SSR_RECRUIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(SSR[^\]]+\])").unwrap());

/// The `SSR … [name]` recruit label used by recruitment announcements.
pub fn ssr_recruit(text: &str) -> Option<String> {
    SSR_RECRUIT.captures(text).map(|caps| caps[1].to_string())
}

/// Slice of `text` from byte offset `from` up to the next occurrence of
/// `marker`, or to the end of the text. Scanning attributes of one entity
/// inside its own window keeps two entities announced in the same document
/// from contaminating each other.
pub fn bounded_window<'a>(text: &'a str, from: usize, marker: &str) -> &'a str {
    let tail = &text[from..];
    match tail.find(marker) {
        Some(next) => &tail[..next],
        None => tail,
    }
}

/// Windows starting at each occurrence of `marker`, each ending where the
/// next occurrence begins.
pub fn marker_windows<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    let starts: Vec<usize> = text.match_indices(marker).map(|(i, _)| i).collect();
    starts
        .iter()
        .map(|&i| bounded_window(text, i + marker.len(), marker))
        .collect()
}
