//! Wrapping raw events into collector-style envelope records.
//!
//! Every raw event handed to the rule-testing toolchain must look like it
//! came off a collector: a JSON object with fixed metadata around the
//! original event text in `body`. Lines that already carry an envelope pass
//! through untouched and are never wrapped a second time.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compress::compress_raw_events;
use crate::error::{CodecError, Result};
use crate::format::is_enveloped_line;
use crate::xml::{self, Segment};

/// All-zero GUID used for `task_id` and `input_id`.
pub const ZERO_GUID: &str = "00000000-0000-0000-0000-000000000000";
pub const RECV_IPV4: &str = "127.0.0.1";
pub const TAG: &str = "some_tag";
pub const RAW_TYPE: &str = "raw";

// =============================================================================
// MIME type
// =============================================================================

/// The MIME tokens the toolchain accepts for raw events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "application/x-pt-eventlog")]
    PtEventLog,
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/plain")]
    Plain,
    #[serde(rename = "text/csv")]
    Csv,
    #[serde(rename = "text/xml")]
    Xml,
}

impl MimeType {
    pub const ALL: [MimeType; 5] = [
        MimeType::PtEventLog,
        MimeType::Json,
        MimeType::Plain,
        MimeType::Csv,
        MimeType::Xml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::PtEventLog => "application/x-pt-eventlog",
            MimeType::Json => "application/json",
            MimeType::Plain => "text/plain",
            MimeType::Csv => "text/csv",
            MimeType::Xml => "text/xml",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CodecError::MissingMime);
        }
        MimeType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CodecError::UnknownMime(s.to_string()))
    }
}

// =============================================================================
// Envelope record
// =============================================================================

/// One raw event wrapped in collector metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub body: String,
    pub recv_ipv4: String,
    pub recv_time: String,
    pub task_id: String,
    pub tag: String,
    pub mime: MimeType,
    pub normalized: bool,
    pub input_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
}

impl EnvelopeRecord {
    /// Wrap `body`, stamping the current time and a fresh UUID.
    pub fn wrap(body: impl Into<String>, mime: MimeType) -> Self {
        EnvelopeRecord {
            body: body.into(),
            recv_ipv4: RECV_IPV4.to_string(),
            recv_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            task_id: ZERO_GUID.to_string(),
            tag: TAG.to_string(),
            mime,
            normalized: false,
            input_id: ZERO_GUID.to_string(),
            kind: RAW_TYPE.to_string(),
            uuid: Uuid::new_v4().to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Enveloping
// =============================================================================

// Copying a group from the SIEM console prefixes the event with its
// importance column; only the empty and "medium" spellings are recognised.
static IMPORTANCE_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(?:medium)?","(.*?)"$"#).expect("valid regex"));

/// Recover the bare event from a `"medium","<event>"` / `"","<event>"` line.
pub fn strip_importance_artifact(line: &str) -> &str {
    IMPORTANCE_ARTIFACT
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or(line, |m| m.as_str())
}

/// Envelope raw events given a textual MIME token.
///
/// An empty token is [`CodecError::MissingMime`]; an unrecognised one is
/// [`CodecError::UnknownMime`].
pub fn add_envelope(raw_events: &str, mime: &str) -> Result<Vec<String>> {
    if raw_events.trim().is_empty() {
        return Err(CodecError::NoEvents);
    }
    let mime: MimeType = mime.parse()?;
    envelope_events(raw_events, mime)
}

/// One raw event waiting to be wrapped.
enum RawEvent {
    Line(String),
    Xml(serde_json::Value),
}

/// Envelope every raw event in `raw_events`, one JSON line per event, in
/// input order.
///
/// `<Event>` fragments are converted to JSON; every other non-empty line is
/// an event of its own. Lines that are already enveloped pass through
/// unchanged. A batch in which every line is already enveloped is rejected.
pub fn envelope_events(raw_events: &str, mime: MimeType) -> Result<Vec<String>> {
    let trimmed = raw_events.trim();
    if trimmed.is_empty() {
        return Err(CodecError::NoEvents);
    }

    let mut events = Vec::new();
    for segment in xml::segments(trimmed)? {
        match segment {
            Segment::Event(value) => events.push(RawEvent::Xml(value)),
            Segment::Text(text) => {
                let compressed = compress_raw_events(&text)?;
                events.extend(
                    compressed
                        .split('\n')
                        .map(|line| line.trim_end_matches('\r'))
                        .filter(|line| !line.trim().is_empty())
                        .map(|line| RawEvent::Line(line.to_string())),
                );
            }
        }
    }

    if events.is_empty() {
        return Err(CodecError::NoEvents);
    }
    if events
        .iter()
        .all(|event| matches!(event, RawEvent::Line(line) if is_enveloped_line(line)))
    {
        return Err(CodecError::AlreadyEnveloped);
    }

    let mut out = Vec::with_capacity(events.len());
    for (index, event) in events.into_iter().enumerate() {
        match event {
            RawEvent::Xml(value) => {
                out.push(EnvelopeRecord::wrap(serde_json::to_string(&value)?, mime).to_json()?);
            }
            RawEvent::Line(line) if is_enveloped_line(&line) => {
                log::debug!("event #{index} already enveloped, passing through");
                out.push(line);
            }
            RawEvent::Line(line) => {
                let body = strip_importance_artifact(&line);
                out.push(EnvelopeRecord::wrap(body, mime).to_json()?);
            }
        }
    }
    Ok(out)
}
