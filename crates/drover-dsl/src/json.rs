//! JSON text helpers used while assembling job documents.

/// Escape a value for embedding inside a JSON string literal.
///
/// Exactly eight characters are rewritten: backspace, tab, newline, form feed,
/// carriage return, `"`, `/` and `\`. Everything else passes through.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '/' => out.push_str("\\/"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

/// Flatten an array of single-key objects into one object.
///
/// `[{"A":"1"},{"B":["x","y"]}]` becomes `{"A":"1","B":["x","y"]}`. Members
/// are copied textually, so nested arrays and maps keep their structure.
pub fn promote(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    let members: Vec<&str> = split_top_level(inner)
        .into_iter()
        .map(|part| {
            let part = part.trim();
            part.strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
                .unwrap_or(part)
                .trim()
        })
        .filter(|body| !body.is_empty())
        .collect();

    format!("{{{}}}", members.join(","))
}

/// Split on commas that sit outside strings and outside any `{}`/`[]` nesting.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
