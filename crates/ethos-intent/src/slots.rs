//! Slot extraction: tag annotation and task text.
//!
//! A task is the utterance with its `[tag: ...]` annotation, its lead-in
//! phrase ("remind me to", "set a reminder to", ...) and its time
//! expression removed.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[tag:\s*(.*?)\s*\]").unwrap());

static RE_LEAD_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:hey\s+)?ethos[,\s]+)?(?:please\s+)?(?:remind\s+me|set\s+(?:a\s+|an\s+)?(?:reminder|alarm)|alert\s+me|schedule(?:\s+(?:a|an|the))?(?:\s+(?:event|meeting|appointment))?|book\s+(?:a\s+|an\s+)?(?:meeting|appointment)|add\s+(?:an\s+)?event)\b",
    )
    .unwrap()
});

static RE_CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:to|about|that|for|of)\b").unwrap());

static RE_TRAILING_PREPOSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:at|on|by|in|for)\s*$").unwrap());

/// Split a `[tag: value]` annotation out of `text`.
///
/// Returns the text with every annotation removed and the first non-empty
/// tag value, if any.
pub fn extract_tag(text: &str) -> (String, Option<String>) {
    let tag = RE_TAG
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .find(|t| !t.is_empty());
    let cleaned = RE_TAG.replace_all(text, " ");
    (collapse_whitespace(&cleaned), tag)
}

/// Remove the byte ranges in `spans` from `text`.
///
/// Spans must lie on character boundaries; overlapping or unsorted spans
/// are tolerated.
pub fn remove_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut sorted: Vec<&Range<usize>> = spans.iter().collect();
    sorted.sort_by_key(|s| s.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in sorted {
        let start = span.start.clamp(cursor, text.len());
        let end = span.end.clamp(start, text.len());
        out.push_str(&text[cursor..start]);
        out.push(' ');
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Derive the task description from a tag-free utterance and the spans of
/// its time expression.
pub fn clean_task(text: &str, time_spans: &[Range<usize>]) -> String {
    let without_time = remove_spans(text, time_spans);
    let without_lead = RE_LEAD_IN.replace(&without_time, "");
    let without_connector = RE_CONNECTOR.replace(&without_lead, "");
    let collapsed = collapse_whitespace(&without_connector);
    let trimmed = RE_TRAILING_PREPOSITION.replace(&collapsed, "");
    trimmed
        .trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
        .to_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
