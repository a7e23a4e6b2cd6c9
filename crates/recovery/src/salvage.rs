//! Object-level salvage: the last stop before giving up.
//!
//! When an array refuses to parse as a whole, its body is split into
//! candidate object substrings by a balanced-brace scan and each
//! candidate is repaired and parsed on its own. Whatever parses is kept;
//! the rest is skipped, never fatal.

use serde_json::Value;
use tracing::debug;

use crate::repair;

/// Collect every individually-parseable object found in `text`.
pub(crate) fn salvage_objects(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();

    for candidate in split_candidates(text) {
        match repair_candidate(&candidate) {
            Some(value) => objects.push(value),
            None => {
                debug!(len = candidate.len(), "skipping unparseable candidate object");
            }
        }
    }
    objects
}

/// Top-level `{...}` spans, by a string-aware brace scan. A span still
/// open at the end of the text is emitted too so the tail gets a repair
/// attempt.
fn split_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut depth: u32 = 0;
    let mut start = None;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = start.take() {
                        candidates.push(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        candidates.push(text[s..].to_string());
    }
    candidates
}

/// Re-add a missing leading brace, quote bare keys, then run the full
/// repair pipeline (which balances quotes and braces) and parse.
fn repair_candidate(candidate: &str) -> Option<Value> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut work = trimmed.to_string();
    if !work.starts_with('{') {
        work.insert(0, '{');
    }
    let work = quote_bare_keys(&work);
    let work = repair::repair_text(&work);

    match serde_json::from_str::<Value>(&work) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Wrap bare identifiers in quotes where a key is expected (after `{` or
/// `,`, followed by `:`).
fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            i += 1;
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
                i += 1;
            }
            '{' | ',' => {
                expect_key = true;
                out.push(ch);
                i += 1;
            }
            c if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            c if expect_key && (c.is_ascii_alphabetic() || c == '_') => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if chars.get(j) == Some(&':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
                expect_key = false;
            }
            _ => {
                expect_key = false;
                out.push(ch);
                i += 1;
            }
        }
    }
    out
}
