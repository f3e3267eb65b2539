//! Windows EventLog XML to JSON conversion.
//!
//! Each `<Event>` fragment becomes one JSON object rooted at `"Event"`:
//!
//! - attributes become keys of the element object (`xmlns` included),
//! - an element holding only text becomes a string,
//! - an element with attributes *and* text keeps the text under `text`,
//! - repeated sibling elements collapse into an array,
//! - an empty element without attributes becomes `""`.
//!
//! Fragments are converted independently; one that fails to parse is logged
//! and skipped so a single broken event never aborts the batch.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::format::XML_EVENT;

/// Key under which element text is stored when the element also has attributes.
pub const TEXT_KEY: &str = "text";

// EventViewer's tree view prefixes expandable nodes with "- " when copied.
static ARTIFACT_EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*- <Event ").expect("valid regex"));
static ARTIFACT_SYSTEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*- <System>").expect("valid regex"));
static ARTIFACT_EVENT_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*- <EventData>").expect("valid regex"));

/// Rewrite `- <Event `, `- <System>` and `- <EventData>` line prefixes to the
/// bare tags.
pub fn strip_viewer_artifacts(text: &str) -> String {
    let text = ARTIFACT_EVENT.replace_all(text, "<Event ");
    let text = ARTIFACT_SYSTEM.replace_all(&text, "<System>");
    ARTIFACT_EVENT_DATA
        .replace_all(&text, "<EventData>")
        .into_owned()
}

/// A stretch of raw input: a converted `<Event>` fragment or the text
/// between fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Event(Value),
}

/// Split `text` into converted `<Event>` fragments and the text around them,
/// in document order.
///
/// Fragments that fail to convert are logged and skipped. Returns
/// [`CodecError::NoXmlEvents`] when fragments are present but none converts.
pub fn segments(text: &str) -> Result<Vec<Segment>> {
    let cleaned = strip_viewer_artifacts(text);

    let mut segments = Vec::new();
    let mut last = 0;
    let mut found = 0usize;
    let mut converted = 0usize;

    for (index, fragment) in XML_EVENT.find_iter(&cleaned).enumerate() {
        let between = &cleaned[last..fragment.start()];
        if !between.trim().is_empty() {
            segments.push(Segment::Text(between.to_string()));
        }
        last = fragment.end();
        found += 1;

        match convert_fragment(fragment.as_str()) {
            Ok(value) => {
                converted += 1;
                segments.push(Segment::Event(value));
            }
            Err(e) => log::warn!("skipping XML event #{index}: {e}"),
        }
    }

    let rest = &cleaned[last..];
    if !rest.trim().is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    if found > 0 && converted == 0 {
        return Err(CodecError::NoXmlEvents);
    }
    log::debug!("converted {converted} of {found} XML event(s)");
    Ok(segments)
}

/// Convert every `<Event>` fragment in `text` to JSON, in document order.
///
/// Text outside the fragments is ignored. Returns [`CodecError::NoXmlEvents`]
/// when no fragment converts.
pub fn convert(text: &str) -> Result<Vec<Value>> {
    let events: Vec<Value> = segments(text)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Event(value) => Some(value),
            Segment::Text(_) => None,
        })
        .collect();

    if events.is_empty() {
        return Err(CodecError::NoXmlEvents);
    }
    Ok(events)
}

// =============================================================================
// Fragment conversion
// =============================================================================

/// An element whose end tag has not been seen yet.
struct OpenElement {
    name: String,
    attributes: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl OpenElement {
    fn from_start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(OpenElement {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let text = clean_text(&self.text);

        if self.attributes.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(text));
        }

        let mut object = self.attributes;
        for (name, value) in self.children {
            match object.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(name, value);
                }
            }
        }
        if !text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        (self.name, Value::Object(object))
    }
}

/// Drop control whitespace and the padding around it.
fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn convert_fragment(fragment: &str) -> std::result::Result<Value, String> {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            XmlEvent::Start(start) => stack.push(OpenElement::from_start(&start)?),
            XmlEvent::Empty(start) => {
                let element = OpenElement::from_start(&start)?.into_value();
                attach(&mut stack, &mut root, element);
            }
            XmlEvent::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?
                    .into_value();
                attach(&mut stack, &mut root, element);
            }
            XmlEvent::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            XmlEvent::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(data.as_ref()));
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    let (name, value) = root.ok_or_else(|| "empty fragment".to_string())?;

    let mut object = Map::new();
    object.insert(name, value);
    Ok(Value::Object(object))
}

fn attach(
    stack: &mut [OpenElement],
    root: &mut Option<(String, Value)>,
    element: (String, Value),
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
