//! Textual repairs for almost-JSON.
//!
//! Every pass is string-aware: a small scanner tracks whether the current
//! character sits inside a double-quoted span (with escape handling), so
//! repairs never touch the contents of legitimate string values. In
//! particular, apostrophes inside double-quoted strings survive the
//! single-quote conversion.

/// Full repair pipeline: quote normalization, Python-style literals,
/// trailing-comma removal, missing-comma insertion, bracket balancing.
pub(crate) fn repair_text(text: &str) -> String {
    let repaired = normalize_quotes(text);
    let repaired = replace_python_literals(&repaired);
    let repaired = strip_trailing_commas(&repaired);
    let repaired = insert_missing_commas(&repaired);
    balance_brackets(&repaired)
}

/// Convert single-quoted strings to double-quoted ones.
///
/// Quote characters inside an already-double-quoted span are left alone,
/// so `"it's fine"` keeps its apostrophe. An apostrophe inside a
/// single-quoted value still terminates that value early - inherent to
/// the heuristic, since nothing distinguishes it from a closing quote.
fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for ch in text.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_double || in_single => {
                out.push(ch);
                escaped = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push('"');
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Replace bare `True`/`False`/`None` tokens outside strings.
fn replace_python_literals(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
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
        if ch == '"' {
            in_string = true;
            out.push(ch);
            i += 1;
            continue;
        }
        if ch.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match word.as_str() {
                "True" => out.push_str("true"),
                "False" => out.push_str("false"),
                "None" => out.push_str("null"),
                _ => out.push_str(&word),
            }
            continue;
        }
        out.push(ch);
        i += 1;
    }
    out
}

/// Drop commas that directly precede a closing `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Insert commas between adjacent `}{`, `][`, `}[`, `]{` tokens.
fn insert_missing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '}' | ']' => {
                out.push(ch);
                let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
                if matches!(next, Some('{') | Some('[')) {
                    out.push(',');
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Close an unterminated string, then append the closers every unmatched
/// `{`/`[` still needs, innermost first.
pub(crate) fn balance_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
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
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// When the decoder choked inside the final 10% of the input, cut back to
/// the end of the last complete top-level array element and rebalance,
/// discarding the incomplete tail.
pub(crate) fn repair_truncation(text: &str) -> Option<String> {
    let error = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(_) => return None,
        Err(error) => error,
    };

    let offset = byte_offset(text, error.line(), error.column());
    if offset < text.len().saturating_mul(9) / 10 {
        return None;
    }

    let cut = last_complete_element_end(text)?;
    Some(balance_brackets(&text[..=cut]))
}

/// Byte offset of a 1-based line/column pair reported by serde_json.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, segment) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            return (offset + column.saturating_sub(1)).min(text.len());
        }
        offset += segment.len();
    }
    text.len()
}

/// Position of the last `}` that completes an element directly inside the
/// top-level array.
fn last_complete_element_end(text: &str) -> Option<usize> {
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_end = None;

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
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if ch == '}' && depth == 1 {
                    last_end = Some(i);
                }
            }
            _ => {}
        }
    }
    last_end
}
