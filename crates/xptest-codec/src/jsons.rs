//! Extraction of JSON objects embedded in free-form tool output.

use serde::de::IgnoredAny;

/// Return every top-level `{...}` span in `text` that parses as JSON,
/// verbatim and in order.
///
/// Braces inside string literals do not count. Quotes outside an object are
/// ordinary text, so log lines around the objects never confuse the scanner.
/// A `{` that never closes, or whose span is not valid JSON, is treated as
/// text and scanning resumes right after it.
pub fn extract_json_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut from = 0usize;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        match balanced_end(text, start) {
            Some(end) if serde_json::from_str::<IgnoredAny>(&text[start..=end]).is_ok() => {
                objects.push(&text[start..=end]);
                from = end + 1;
            }
            _ => from = start + 1,
        }
    }

    objects
}

/// Byte index of the `}` that closes the `{` at `start`, if any.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}
