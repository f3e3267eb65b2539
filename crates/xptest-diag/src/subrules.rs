//! Sub-rule references in correlation rule code.
//!
//! A correlation rule can consume events produced by other correlation rules
//! (sub-rules) by filtering on `correlation_name`. Integration tests of such
//! rules need to know which sub-rules to run.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{DiagError, Result};

static NAME_COMPARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"correlation_name\s*==\s*"(\w+)""#).expect("valid regex"));

static LOWER_NAME_COMPARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"lower\s*\(\s*correlation_name\s*\)\s*==\s*"(\w+)""#).expect("valid regex")
});

static IN_LIST_LOWER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"in_list\s*\(\s*(\[[\w\W]+\])\s*,\s*lower\s*\(\s*correlation_name\s*\)")
        .expect("valid regex")
});

static IN_LIST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"in_list\s*\(\s*(\[[\w\W]+\])\s*,\s*correlation_name\s*\)").expect("valid regex")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*)\]").expect("valid regex"));

/// `true` if `rule_code` filters on `correlation_name` in any known form.
pub fn rule_contains_subrules(rule_code: &str) -> bool {
    [
        &NAME_COMPARE,
        &LOWER_NAME_COMPARE,
        &IN_LIST_LOWER_NAME,
        &IN_LIST_NAME,
    ]
    .iter()
    .any(|re| re.is_match(rule_code))
}

/// Collect the sub-rule names `rule_code` filters on.
///
/// Names come out grouped by the form they were written in: direct
/// comparisons, `lower(...)` comparisons, then `in_list` arrays.
pub fn parse_sub_rule_names(rule_code: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();

    for re in [&NAME_COMPARE, &LOWER_NAME_COMPARE] {
        names.extend(re.captures_iter(rule_code).map(|caps| caps[1].to_string()));
    }

    for re in [&IN_LIST_LOWER_NAME, &IN_LIST_NAME] {
        for caps in re.captures_iter(rule_code) {
            names.extend(parse_name_array(&caps[1])?);
        }
    }

    Ok(names)
}

/// Parse an `in_list` array literal. Comments and a trailing comma are
/// allowed, as in rule code.
fn parse_name_array(array: &str) -> Result<Vec<String>> {
    let cleaned = strip_comments(array);
    let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1]");

    let values: Vec<Value> = serde_json::from_str(&cleaned)
        .map_err(|e| DiagError::SubRuleNames(format!("{e} in {}", array.trim())))?;

    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            other => Err(DiagError::SubRuleNames(format!(
                "expected a string, got {other}"
            ))),
        })
        .collect()
}

/// Drop `#` comments that are outside string literals.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;

    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                out.push(c);
            }
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        match c {
            '#' => in_comment = true,
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Keep the JSON events produced by the correlation rule `rule_name`.
///
/// Lines that are not valid JSON are logged and skipped.
pub fn filter_correlation_events<'a, I>(jsons: I, rule_name: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    jsons
        .into_iter()
        .filter(|json| match serde_json::from_str::<Value>(json) {
            Ok(event) => event.get("correlation_name").and_then(Value::as_str) == Some(rule_name),
            Err(e) => {
                log::warn!("skipping malformed correlation event: {e}");
                false
            }
        })
        .map(|json| json.trim().to_string())
        .collect()
}
