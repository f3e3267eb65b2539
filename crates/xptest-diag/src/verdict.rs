//! Verdicts: what a test run's output says about the test.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use xptest_codec::{TestCode, extract_json_objects, sort_top_level_keys, to_pretty_json};

use crate::config::HarnessConfig;
use crate::diff::diff_json;

/// Outcome of a test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "output", rename_all = "lowercase")]
pub enum Verdict {
    /// The test passed. Carries the formatted result events.
    Success(String),
    /// The test failed. Carries a diff or the raw tool output.
    Failed(String),
    /// The tool printed nothing.
    Unknown,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success(_))
    }

    /// Text to show the user, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Verdict::Success(s) | Verdict::Failed(s) => Some(s),
            Verdict::Unknown => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success(_) => write!(f, "success"),
            Verdict::Failed(_) => write!(f, "failed"),
            Verdict::Unknown => write!(f, "unknown"),
        }
    }
}

// =============================================================================
// Integration test output
// =============================================================================

/// Interpret the output of an integration test run.
///
/// `expectation` is the test code the run was checked against. Anything
/// that cannot be diffed (an unreadable expectation included) falls
/// back to the raw output.
pub fn classify_verdict(output: &str, expectation: &str, config: &HarnessConfig) -> Verdict {
    if output.trim().is_empty() {
        return Verdict::Unknown;
    }

    if output.contains(&config.success_marker) {
        return Verdict::Success(format_success_output(output, config));
    }

    Verdict::Failed(failed_output(output, expectation, config))
}

/// Pretty-format every result event in a successful run's output.
pub fn format_success_output(output: &str, config: &HarnessConfig) -> String {
    let fields = config.bookkeeping_fields();
    parse_objects(output)
        .into_iter()
        .map(|mut event| {
            remove_fields(&mut event, &fields);
            to_pretty_json(&sort_top_level_keys(Value::Object(event)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn failed_output(output: &str, expectation: &str, config: &HarnessConfig) -> String {
    let Some((_, results)) = output.split_once(config.results_marker.as_str()) else {
        log::debug!("no results marker in failed output");
        return output.to_string();
    };

    let mut actual = parse_objects(results);
    if actual.is_empty() {
        return config.no_results_message.clone();
    }

    let test_code = match TestCode::parse(expectation) {
        Ok(tc) => tc,
        Err(e) => {
            log::warn!("cannot read expectation, showing raw output: {e}");
            return output.to_string();
        }
    };
    if test_code.is_negative() {
        return output.to_string();
    }
    let expected = match (actual.len(), test_code.single_expectation()) {
        (1, Some(e)) => &e.body,
        (n, _) => {
            log::debug!("{n} result(s), multi-event diff not attempted");
            return output.to_string();
        }
    };
    let Value::Object(expected) = expected else {
        return output.to_string();
    };

    let ignored = config.ignored_fields();
    let mut expected = expected.clone();
    remove_fields(&mut expected, &ignored);

    let mut actual = actual.remove(0);
    remove_fields(&mut actual, &ignored);
    let actual = filter_keys(actual, &expected);

    diff_json(&Value::Object(expected), &Value::Object(actual)).text
}

// =============================================================================
// Normalization output
// =============================================================================

/// Fields that the normalizer's appendix derives by coalescing other fields.
///
/// When any source field is set, the derived host is not compared.
const COALESCED_HOSTS: &[(&str, &[&str])] = &[
    (
        "event_src.host",
        &[
            "event_src.fqdn",
            "event_src.hostname",
            "event_src.ip",
            "recv_ipv4",
            "recv_ipv6",
            "recv_host",
        ],
    ),
    ("src.host", &["src.fqdn", "src.hostname", "src.ip", "src.mac"]),
    ("dst.host", &["dst.fqdn", "dst.hostname", "dst.ip", "dst.mac"]),
    (
        "external_src.host",
        &["external_src.fqdn", "external_src.hostname", "external_src.ip"],
    ),
    (
        "external_dst.host",
        &["external_dst.fqdn", "external_dst.hostname", "external_dst.ip"],
    ),
];

const DEFAULT_IMPORTANCE: &str = "info";

/// Compare an expected normalized event with the normalizer's actual event.
///
/// The actual event is cleared of fields the normalizer fills on its own and
/// then filtered to the expected keys.
pub fn compare_normalized(expected: &Map<String, Value>, actual: Map<String, Value>) -> Verdict {
    let actual = filter_keys(clear_irrelevant_fields(actual), expected);
    let diff = diff_json(&Value::Object(expected.clone()), &Value::Object(actual));
    if diff.changed {
        Verdict::Failed(diff.text)
    } else {
        Verdict::Success(String::new())
    }
}

/// Drop receive times and appendix-derived hosts, default `importance`.
pub fn clear_irrelevant_fields(mut event: Map<String, Value>) -> Map<String, Value> {
    event.shift_remove("recv_time");
    event.shift_remove("time");

    for (derived, sources) in COALESCED_HOSTS {
        if sources.iter().any(|s| event.get(*s).is_some_and(is_truthy)) {
            event.shift_remove(*derived);
        }
    }

    if !event.get("importance").is_some_and(is_truthy) {
        event.insert(
            "importance".to_string(),
            Value::String(DEFAULT_IMPORTANCE.to_string()),
        );
    }
    event
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_objects(text: &str) -> Vec<Map<String, Value>> {
    extract_json_objects(text)
        .into_iter()
        .filter_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

fn remove_fields(event: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        event.shift_remove(*field);
    }
}

/// Keep only the keys of `actual` that also appear in `expected`.
fn filter_keys(actual: Map<String, Value>, expected: &Map<String, Value>) -> Map<String, Value> {
    actual
        .into_iter()
        .filter(|(k, _)| expected.contains_key(k))
        .collect()
}
