//! Recovery parser for loosely-structured model output.
//!
//! LLM-generated "JSON" is not guaranteed well-formed: truncated tails,
//! single quotes, trailing commas, markdown fences, prose around the
//! payload. [`parse_json_output`] runs a cascade of increasingly
//! aggressive strategies and hands back whatever structured data it can
//! recover. It never panics and never errors: malformed output is an
//! expected, non-exceptional occurrence in this domain, so total failure
//! degrades to an empty array the caller can treat as "no results".
//!
//! Strategy order, first success wins:
//! 1. direct parse;
//! 2. textual repair (quotes, literals, commas, brackets) and reparse;
//! 3. truncation repair when the decoder choked near the tail;
//! 4. extraction of a fenced or embedded array/object;
//! 5. object-by-object salvage of the array body;
//! 6. empty-array fallback.

mod extract;
mod repair;
mod salvage;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use extract::Extracted;

/// Recover a JSON array or object from `text`.
///
/// Returns `Value::Array` or `Value::Object`; on total failure, an empty
/// `Value::Array`.
pub fn parse_json_output(text: &str) -> Value {
    match try_parse(text) {
        Some(value) => value,
        None => {
            warn!(
                prefix = text_prefix(text),
                "unable to recover structured data from output"
            );
            Value::Array(Vec::new())
        }
    }
}

/// Fast path for callers that already hold a parsed value.
///
/// Arrays and objects pass through unchanged; a string value is run
/// through the recovery cascade; anything else degrades to the
/// empty-array sentinel.
pub fn coerce_json_value(value: Value) -> Value {
    match value {
        value @ (Value::Array(_) | Value::Object(_)) => value,
        Value::String(text) => parse_json_output(&text),
        _ => Value::Array(Vec::new()),
    }
}

/// Recover a uniform list of objects.
///
/// A recovered bare object becomes a single-element list; non-object
/// array elements are dropped.
pub fn parse_object_list(text: &str) -> Vec<Map<String, Value>> {
    match parse_json_output(text) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}

/// Recover structured data and deserialize it into `T`.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = try_parse(text)?;
    serde_json::from_value(value).ok()
}

fn try_parse(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_or_repair(trimmed) {
        return Some(value);
    }

    debug!("inline repair failed, attempting extraction");
    match extract::extract_candidate(trimmed) {
        Some(Extracted::Array(span)) => {
            if let Some(value) = parse_or_repair(&span) {
                return Some(value);
            }
            debug!("extracted array unparseable, salvaging objects");
            let objects = salvage::salvage_objects(&span);
            if !objects.is_empty() {
                return Some(Value::Array(objects));
            }
        }
        Some(Extracted::Object(span)) => {
            if let Some(value) = parse_or_repair(&span) {
                // Wrapped for uniformity with array extraction.
                return Some(Value::Array(vec![value]));
            }
        }
        None => {}
    }

    debug!("extraction failed, salvaging objects from raw text");
    let objects = salvage::salvage_objects(trimmed);
    if !objects.is_empty() {
        return Some(Value::Array(objects));
    }
    None
}

/// Strategies 1-3 against a single span: direct parse, textual repair,
/// truncation repair (on both the raw and repaired forms).
fn parse_or_repair(text: &str) -> Option<Value> {
    if let Some(value) = parse_structured(text) {
        return Some(value);
    }

    let repaired = repair::repair_text(text);
    if let Some(value) = parse_structured(&repaired) {
        return Some(value);
    }

    if let Some(cut) = repair::repair_truncation(text) {
        if let Some(value) = parse_structured(&cut) {
            return Some(value);
        }
    }
    if let Some(cut) = repair::repair_truncation(&repaired) {
        if let Some(value) = parse_structured(&cut) {
            return Some(value);
        }
    }
    None
}

/// Parse, accepting only arrays and objects. Scalars are not structured
/// output.
fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => Some(value),
        _ => None,
    }
}

fn text_prefix(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
