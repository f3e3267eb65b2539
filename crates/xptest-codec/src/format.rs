//! Shape detection for raw event text.
//!
//! Raw events reach the harness in whatever form an operator copied them:
//! an EventViewer XML dump, a pretty-printed JSON object, JSON lines, lines
//! that already carry an envelope, or an opaque syslog-style line. This
//! module decides which of those shapes a block of text is.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// The shape of a block of raw event text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFormat {
    /// One or more Windows EventLog `<Event>` fragments.
    Xml,
    /// Every event already carries an envelope (`body` key present).
    EnvelopedJson,
    /// JSON object(s) without an envelope, compact or pretty-printed.
    RawJson,
    /// Anything else; treated as a single opaque event.
    RawText,
}

impl fmt::Display for EventFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventFormat::Xml => "xml",
            EventFormat::EnvelopedJson => "enveloped_json",
            EventFormat::RawJson => "raw_json",
            EventFormat::RawText => "raw_text",
        };
        f.write_str(s)
    }
}

// `<EventData>` must not count as an event fragment, hence the `[\s>]` guard.
pub(crate) static XML_EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Event[\s>].*?</Event>").expect("valid regex"));

/// Classify a block of raw event text.
///
/// Classification is total: every input maps to exactly one variant.
/// XML detection wins over everything else so that an EventViewer dump with
/// `- ` copy artifacts is never mistaken for text.
pub fn classify(text: &str) -> EventFormat {
    let trimmed = text.trim();

    if is_xml(trimmed) {
        return EventFormat::Xml;
    }

    if is_enveloped(trimmed) {
        return EventFormat::EnvelopedJson;
    }

    if trimmed.starts_with('{') {
        return EventFormat::RawJson;
    }

    EventFormat::RawText
}

/// `true` when the text contains at least one `<Event ...>...</Event>` fragment.
pub fn is_xml(text: &str) -> bool {
    XML_EVENT.is_match(text)
}

/// `true` when the text is a single enveloped object, or every non-empty
/// line is an enveloped object.
pub fn is_enveloped(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    // A single (possibly pretty-printed) object.
    if is_enveloped_line(trimmed) {
        return true;
    }

    if !trimmed.contains('\n') {
        return false;
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(is_enveloped_line)
}

/// `true` when `line` parses as a JSON object that has a `body` key.
pub fn is_enveloped_line(line: &str) -> bool {
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(Value::Object(map)) => map.contains_key("body"),
        _ => false,
    }
}
