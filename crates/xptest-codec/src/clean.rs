//! Removal of volatile fields from test code and test results.
//!
//! Fields such as `uuid` or `time` differ on every run, so they are dropped
//! from expectations before they are stored. Cleaning works on the text
//! directly, so it applies equally to compact and pretty JSON and leaves the
//! surrounding test-code lines alone.

use regex::Regex;
use serde_json::Value;

use crate::error::{CodecError, Result};

/// String-valued keys removed from test code.
pub const VOLATILE_STRING_KEYS: &[&str] = &[
    "generator.version",
    "uuid",
    "time",
    "incident.name",
    "siem_id",
    "labels",
];

/// Array-valued keys removed from test code.
pub const VOLATILE_ARRAY_KEYS: &[&str] = &["_subjects", "_objects", "subevents", "subevents.time"];

/// Keys kept by [`clean_test_result`] although test code drops them.
const RESULT_KEPT_KEYS: &[&str] = &["time", "incident.name"];

enum ValueShape {
    String,
    Array,
}

/// Build the "middle of object" and "end of object" removal patterns for a key.
fn key_patterns(key: &str, shape: ValueShape) -> [Regex; 2] {
    let key = regex::escape(key);
    let value = match shape {
        ValueShape::String => r#"".*?""#,
        ValueShape::Array => r"\[[\s\S]*?\]",
    };
    let middle = format!(r#"\s*"{key}"\s*:\s*{value},"#);
    let end = format!(r#",\s*"{key}"\s*:\s*{value}"#);
    // Patterns are assembled from escaped keys and fixed fragments.
    [
        Regex::new(&middle).expect("valid regex"),
        Regex::new(&end).expect("valid regex"),
    ]
}

fn remove_keys<'a>(text: &str, string_keys: impl Iterator<Item = &'a str>, array_keys: &[&str]) -> String {
    let patterns = string_keys
        .flat_map(|k| key_patterns(k, ValueShape::String))
        .chain(
            array_keys
                .iter()
                .flat_map(|k| key_patterns(k, ValueShape::Array)),
        );

    patterns.fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// Remove volatile keys from every JSON object embedded in `code`.
pub fn clean_test_code(code: &str) -> Result<String> {
    if code.is_empty() {
        return Err(CodecError::EmptyTestCode);
    }
    Ok(remove_keys(code, VOLATILE_STRING_KEYS.iter().copied(), VOLATILE_ARRAY_KEYS))
}

/// Remove volatile keys from an actual test result, keeping `time` and
/// `incident.name`. Empty input yields empty output.
pub fn clean_test_result(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let string_keys = VOLATILE_STRING_KEYS
        .iter()
        .copied()
        .filter(|k| !RESULT_KEPT_KEYS.contains(k));
    remove_keys(text, string_keys, VOLATILE_ARRAY_KEYS)
}

/// Remove top-level `fields` from every JSON line of `jsonl`.
pub fn remove_fields_from_jsonl(jsonl: &str, fields: &[&str]) -> Result<String> {
    let mut cleaned = Vec::new();
    for line in jsonl.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut value: Value = serde_json::from_str(line)?;
        if let Value::Object(map) = &mut value {
            for field in fields {
                map.shift_remove(*field);
            }
        }
        cleaned.push(serde_json::to_string(&value)?);
    }
    Ok(cleaned.join("\n"))
}
