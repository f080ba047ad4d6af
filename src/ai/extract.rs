use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// JSON recovered from a model reply, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// Strings, numbers, booleans and `null`.
    Scalar(Value),
    /// The candidate text was not JSON.
    Invalid,
}

impl From<Value> for Parsed {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Parsed::Object(map),
            Value::Array(items) => Parsed::Array(items),
            other => Parsed::Scalar(other),
        }
    }
}

lazy_static! {
    static ref FENCED_BLOCK_RE: Regex = Regex::new(r"(?is)```(?:json)?\s*(.*?)```").unwrap();
    static ref OPENING_FENCE_RE: Regex = Regex::new(r"(?i)^```(?:json)?").unwrap();
}

/// Pull a JSON value out of free-form model text.
///
/// A fenced block anywhere in the text wins; otherwise the whole text is parsed after
/// dropping an unmatched opening or closing fence. Never fails: text that does not
/// parse comes back as [`Parsed::Invalid`].
pub fn extract(text: &str) -> Parsed {
    let candidate = match FENCED_BLOCK_RE.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => strip_stray_fences(text),
    };

    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value) => Parsed::from(value),
        Err(_) => Parsed::Invalid,
    }
}

fn strip_stray_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = match OPENING_FENCE_RE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    let without_open = without_open.trim_end();
    without_open.strip_suffix("```").unwrap_or(without_open)
}
