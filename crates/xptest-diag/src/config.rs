//! Harness configuration: the markers and field lists used to read test output.
//!
//! A config is a small YAML document. Every key is optional:
//!
//! ```yaml
//! success_marker: "SUCCESS!"
//! results_marker: "Got these results:"
//! bookkeeping_fields: [_objects, _subjects]
//! ignored_fields: [generator.version, uuid, time]
//! no_results_message: "Got no resulting events"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DiagError, Result};

/// File names looked up by [`HarnessConfig::find_in_ancestors`].
pub const CONFIG_FILE_NAMES: &[&str] = &[".xptest.yml", ".xptest.yaml"];

const DEFAULT_SUCCESS_MARKER: &str = "SUCCESS!";
const DEFAULT_RESULTS_MARKER: &str = "Got these results:";
const DEFAULT_NO_RESULTS_MESSAGE: &str = "Got no resulting events";
const DEFAULT_BOOKKEEPING_FIELDS: &[&str] = &["_objects", "_subjects"];
const DEFAULT_IGNORED_FIELDS: &[&str] = &[
    "generator.version",
    "uuid",
    "time",
    "siem_id",
    "labels",
    "incident.name",
    "_subjects",
    "_objects",
    "subevents",
    "subevents.time",
];

/// How test-runner output is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Substring whose presence marks a passed test.
    pub success_marker: String,
    /// Text after which a failed run prints the events it did produce.
    pub results_marker: String,
    /// Fields stripped from result events shown for a passed test.
    pub bookkeeping_fields: Vec<String>,
    /// Fields dropped from expected and actual events before diffing.
    pub ignored_fields: Vec<String>,
    /// Message reported when a failed run produced no events.
    pub no_results_message: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            results_marker: DEFAULT_RESULTS_MARKER.to_string(),
            bookkeeping_fields: owned(DEFAULT_BOOKKEEPING_FIELDS),
            ignored_fields: owned(DEFAULT_IGNORED_FIELDS),
            no_results_message: DEFAULT_NO_RESULTS_MESSAGE.to_string(),
        }
    }
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarnessConfig {
    #[serde(default)]
    success_marker: Option<String>,
    #[serde(default)]
    results_marker: Option<String>,
    #[serde(default)]
    bookkeeping_fields: Option<Vec<String>>,
    #[serde(default)]
    ignored_fields: Option<Vec<String>>,
    #[serde(default)]
    no_results_message: Option<String>,
}

/// Parse a harness config from a YAML string.
///
/// An empty document yields the defaults.
pub fn parse_config(yaml: &str) -> Result<HarnessConfig> {
    if yaml.trim().is_empty() {
        return Ok(HarnessConfig::default());
    }

    let raw: RawHarnessConfig = serde_yaml::from_str(yaml)?;
    let defaults = HarnessConfig::default();

    let success_marker = raw.success_marker.unwrap_or(defaults.success_marker);
    if success_marker.is_empty() {
        return Err(DiagError::Config(
            "success_marker must not be empty".to_string(),
        ));
    }

    Ok(HarnessConfig {
        success_marker,
        results_marker: raw.results_marker.unwrap_or(defaults.results_marker),
        bookkeeping_fields: raw.bookkeeping_fields.unwrap_or(defaults.bookkeeping_fields),
        ignored_fields: raw.ignored_fields.unwrap_or(defaults.ignored_fields),
        no_results_message: raw
            .no_results_message
            .unwrap_or(defaults.no_results_message),
    })
}

/// Parse a harness config from a YAML file.
pub fn parse_config_file(path: &Path) -> Result<HarnessConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

impl HarnessConfig {
    /// Walk up from `start_path` to find the nearest `.xptest.yml`.
    ///
    /// Checks `start_path` itself (if a directory) or its parent (if a file),
    /// then each ancestor directory until the filesystem root.
    pub fn find_in_ancestors(start_path: &Path) -> Option<PathBuf> {
        let dir = if start_path.is_file() {
            start_path.parent()?
        } else {
            start_path
        };

        let mut current = dir;
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            current = current.parent()?;
        }
    }

    pub fn bookkeeping_fields(&self) -> Vec<&str> {
        self.bookkeeping_fields.iter().map(String::as_str).collect()
    }

    pub fn ignored_fields(&self) -> Vec<&str> {
        self.ignored_fields.iter().map(String::as_str).collect()
    }
}
