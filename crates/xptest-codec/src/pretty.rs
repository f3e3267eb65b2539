//! Compact → pretty formatting for test code.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

/// Indentation used for every pretty-printed object.
pub const INDENT: &[u8] = b"    ";

// A single-line object that is not `{}` and ends its line.
static COMPACT_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(\{\S.+\})\s*$").expect("valid regex"));

/// Serialise `value` with four-space indentation.
pub fn to_pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    // Writing a `Value` into a `Vec` cannot fail.
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Reorder the top-level keys of an object lexicographically so that field
/// families such as `subject.*` sit together. Nested objects keep their order;
/// non-objects are returned as is.
pub fn sort_top_level_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect::<Map<String, Value>>())
        }
        other => other,
    }
}

/// Expand every compact single-line JSON object in `text` into sorted,
/// indented form.
///
/// Candidates that fail to parse are left untouched and logged.
pub fn format_test_code(text: &str) -> String {
    let mut formatted = text.to_string();

    for caps in COMPACT_OBJECT.captures_iter(text) {
        let Some(candidate) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                let pretty = to_pretty_json(&sort_top_level_keys(value));
                formatted = formatted.replacen(candidate, &pretty, 1);
            }
            Err(e) => log::warn!("cannot format event {candidate}: {e}"),
        }
    }

    formatted
}
