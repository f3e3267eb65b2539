//! # xptest-codec
//!
//! Raw-event and test-code codecs for detection-rule test fixtures.
//!
//! Operators capture raw events from wherever they find them: an EventViewer
//! XML dump, a SIEM console, a JSON file, a syslog line. This crate turns that
//! text into the envelope wire format consumed by rule-testing tooling, and
//! keeps test code in a compact on-disk form that round-trips with the pretty
//! form people edit:
//!
//! - **Classification**: XML, already-enveloped JSON, raw JSON or raw text
//! - **XML conversion**: Windows EventLog `<Event>` fragments to JSON
//! - **Compression / formatting**: pretty ⇄ compact JSON for raw events and
//!   for `table_list` / `expect` documents
//! - **Enveloping**: one envelope record per raw event, never re-wrapping
//! - **Test code**: a parsed view of `table_list` / `expect` documents and
//!   removal of volatile fields
//!
//! ## Architecture
//!
//! - **PEG grammar** ([`pest`]) for test-code documents
//! - **quick-xml** event reader for the XML converter
//! - **regex** stages for the textual compaction pipeline
//! - **serde_json** (with `preserve_order`) for every JSON round trip
//!
//! ## Quick Start
//!
//! ```rust
//! use xptest_codec::{EventFormat, add_envelope, classify};
//!
//! let raw = "2022-07-20 07:03:38 W3SVC2 mail-srv 10.0.2.216 POST /Proxy/default.eas";
//! assert_eq!(classify(raw), EventFormat::RawText);
//!
//! let records = add_envelope(raw, "text/plain").unwrap();
//! assert_eq!(records.len(), 1);
//! assert!(records[0].contains("\"type\":\"raw\""));
//! ```
//!
//! ## Compact and pretty test code
//!
//! ```rust
//! use xptest_codec::{compress_test_code, format_test_code};
//!
//! let compact = r#"expect 1 {"b": 2, "a": 1}"#;
//! let pretty = format_test_code(compact);
//! assert_eq!(pretty, "expect 1 {\n    \"a\": 1,\n    \"b\": 2\n}");
//! assert_eq!(compress_test_code(&pretty), r#"expect 1 {"a": 1, "b": 2}"#);
//! ```

pub mod clean;
pub mod compress;
pub mod envelope;
pub mod error;
pub mod format;
pub mod jsons;
pub mod pretty;
pub mod testcode;
pub mod xml;

// Re-export the most commonly used types and functions at crate root
pub use clean::{clean_test_code, clean_test_result, remove_fields_from_jsonl};
pub use compress::{compress_raw_events, compress_test_code};
pub use envelope::{EnvelopeRecord, MimeType, add_envelope, envelope_events, strip_importance_artifact};
pub use error::{CodecError, Result};
pub use format::{EventFormat, classify, is_enveloped, is_enveloped_line, is_xml};
pub use jsons::extract_json_objects;
pub use pretty::{format_test_code, sort_top_level_keys, to_pretty_json};
pub use testcode::{ExpectCount, Expectation, TestCode, TestCodeItem};
pub use xml::convert as convert_xml_events;
