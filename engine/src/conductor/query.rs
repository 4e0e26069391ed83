//! Query text handling: normalization and entity extraction

use regex::Regex;
use std::sync::OnceLock;

static BUS_ID: OnceLock<Regex> = OnceLock::new();
static STOP_ID: OnceLock<Regex> = OnceLock::new();

fn bus_id_pattern() -> &'static Regex {
    BUS_ID.get_or_init(|| Regex::new(r"\b[Bb]\d+\b").expect("Invalid bus id pattern"))
}

fn stop_id_pattern() -> &'static Regex {
    STOP_ID.get_or_init(|| Regex::new(r"\b[Ss]\d+\b").expect("Invalid stop id pattern"))
}

/// Lowercase, trim and collapse internal whitespace to single spaces
pub fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A query worth running through the pipeline has at least one letter or digit
pub fn is_answerable(normalized: &str) -> bool {
    normalized.chars().any(char::is_alphanumeric)
}

/// First bus id (`B<digits>`) in the text, uppercased
pub fn extract_bus_id(text: &str) -> Option<String> {
    bus_id_pattern()
        .find(text)
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// First stop id (`S<digits>`) in the text, uppercased
pub fn extract_stop_id(text: &str) -> Option<String> {
    stop_id_pattern()
        .find(text)
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Canonical form of an id supplied in a plan parameter
pub fn canonical_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Whether any word of `text` starts with one of `keywords`
///
/// Prefix matching lets "delayed" count for "delay" without letting
/// "details" count for "eta".
pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| {
            let w = w.to_lowercase();
            keywords.iter().any(|k| w.starts_with(k))
        })
}
