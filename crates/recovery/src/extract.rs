//! Locating structured data embedded in surrounding prose.
//!
//! Model output routinely wraps the interesting part in markdown fences
//! or chatty lead-ins ("Here are the results: ..."). This module strips
//! fences and pulls out the first embedded array or object by a
//! string-aware bracket scan.

/// An extracted candidate span, still unvalidated.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Extracted {
    Array(String),
    Object(String),
}

/// Strip any code fences and pull out the first embedded array, falling
/// back to the first embedded object. Returns `None` when the text holds
/// no opening bracket at all.
pub(crate) fn extract_candidate(text: &str) -> Option<Extracted> {
    let body = strip_fences(text);

    if let Some(span) = balanced_span(body, '[', ']') {
        return Some(Extracted::Array(span.to_string()));
    }
    if let Some(span) = balanced_span(body, '{', '}') {
        return Some(Extracted::Object(span.to_string()));
    }
    None
}

/// Remove markdown code fences (with or without a `json` language tag)
/// or a single-backtick wrapping.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let mut body = &trimmed[start + 3..];
        for tag in ["json", "JSON"] {
            if let Some(rest) = body.strip_prefix(tag) {
                body = rest;
                break;
            }
        }
        let body = body.trim_start();
        return match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        };
    }

    if let (Some(first), Some(last)) = (trimmed.find('`'), trimmed.rfind('`')) {
        if last > first {
            return trimmed[first + 1..last].trim();
        }
    }

    trimmed
}

/// Slice from the first `opener` to its matching `closer`, skipping
/// bracket characters inside strings. An unclosed span runs to the end
/// of the text; later repair passes balance it.
fn balanced_span(text: &str, opener: char, closer: char) -> Option<&str> {
    let start = find_outside_strings(text, opener)?;
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
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
        if ch == '"' {
            in_string = true;
        } else if ch == opener {
            depth += 1;
        } else if ch == closer {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(&text[start..start + i + closer.len_utf8()]);
            }
        }
    }
    Some(&text[start..])
}

fn find_outside_strings(text: &str, needle: char) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;

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
        if ch == '"' {
            in_string = true;
        } else if ch == needle {
            return Some(i);
        }
    }
    None
}
