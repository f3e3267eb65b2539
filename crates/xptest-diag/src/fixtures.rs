//! Test fixture file names and lookup of intermediate pipeline results.
//!
//! Each integration test `N` of a rule lives in `tests/raw_events_N.json` and
//! `tests/test_conds_N.tc`. A test run leaves one file per pipeline stage in
//! its temporary output directory, e.g. `raw_events_N_norm_enr.json`.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{DiagError, Result};

pub fn raw_events_file_name(test: usize) -> String {
    format!("raw_events_{test}.json")
}

pub fn test_conds_file_name(test: usize) -> String {
    format!("test_conds_{test}.tc")
}

// =============================================================================
// Pipeline stages
// =============================================================================

/// A stage of the rule-testing pipeline that leaves a result file behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Normalized events.
    Norm,
    /// Normalized and enriched events.
    NormEnr,
    /// Correlation events.
    NormEnrCorr,
    /// Enriched correlation events.
    NormEnrCorrEnr,
}

static NORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^raw_events_(\d+)_norm\.json$").expect("valid regex"));
static NORM_ENR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^raw_events_(\d+)_norm_enr\.json$").expect("valid regex"));
// The pipeline spells the suffix both `corr` and `corrr`.
static NORM_ENR_CORR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^raw_events_(\d+)_norm_enr_corrr?\.json$").expect("valid regex")
});
static NORM_ENR_CORR_ENR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^raw_events_(\d+)_norm_enr_corrr?_enr\.json$").expect("valid regex")
});

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Norm,
        Stage::NormEnr,
        Stage::NormEnrCorr,
        Stage::NormEnrCorrEnr,
    ];

    fn pattern(&self) -> &'static Regex {
        match self {
            Stage::Norm => &NORM,
            Stage::NormEnr => &NORM_ENR,
            Stage::NormEnrCorr => &NORM_ENR_CORR,
            Stage::NormEnrCorrEnr => &NORM_ENR_CORR_ENR,
        }
    }

    /// The canonical result file name of test `test` at this stage.
    pub fn file_name(&self, test: usize) -> String {
        format!("raw_events_{test}_{self}.json")
    }

    /// The test number encoded in `file_name`, if the name belongs to this
    /// stage.
    pub fn test_number(&self, file_name: &str) -> Option<usize> {
        self.pattern()
            .captures(file_name)
            .and_then(|caps| caps[1].parse().ok())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Norm => write!(f, "norm"),
            Stage::NormEnr => write!(f, "norm_enr"),
            Stage::NormEnrCorr => write!(f, "norm_enr_corr"),
            Stage::NormEnrCorrEnr => write!(f, "norm_enr_corr_enr"),
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Find the `stage` result file of test `test` anywhere under `dir`.
///
/// The tree is walked in sorted path order and the first match wins. Hidden
/// directories are skipped.
pub fn find_stage_result(dir: &Path, stage: Stage, test: usize) -> Result<PathBuf> {
    find(dir, None, stage, test)
}

/// Like [`find_stage_result`], but only accepts files below a directory
/// named `rule_name`.
pub fn find_rule_stage_result(
    dir: &Path,
    rule_name: &str,
    stage: Stage,
    test: usize,
) -> Result<PathBuf> {
    find(dir, Some(rule_name), stage, test)
}

fn find(dir: &Path, rule_name: Option<&str>, stage: Stage, test: usize) -> Result<PathBuf> {
    let mut visited = HashSet::new();

    fn walk(
        dir: &Path,
        accept: &dyn Fn(&Path) -> bool,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<Option<PathBuf>> {
        let canonical = match dir.canonicalize() {
            Ok(p) => p,
            Err(_) => return Ok(None),
        };
        if !visited.insert(canonical) {
            return Ok(None);
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'))
                {
                    continue;
                }
                if let Some(found) = walk(&path, accept, visited)? {
                    return Ok(Some(found));
                }
            } else if accept(&path) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    let accept = |path: &Path| {
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| stage.test_number(n))
            == Some(test);
        let rule_matches = rule_name.is_none_or(|rule| {
            path.strip_prefix(dir)
                .map(|rel| rel.components().any(|c| c.as_os_str() == rule))
                .unwrap_or(false)
        });
        name_matches && rule_matches
    };

    match walk(dir, &accept, &mut visited)? {
        Some(path) => {
            log::debug!("found {stage} result for test {test}: {}", path.display());
            Ok(path)
        }
        None => Err(DiagError::FixtureNotFound {
            stage: stage.to_string(),
            test,
            dir: dir.display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn fixture_names() {
        assert_eq!(raw_events_file_name(3), "raw_events_3.json");
        assert_eq!(test_conds_file_name(3), "test_conds_3.tc");
        assert_eq!(Stage::NormEnr.file_name(2), "raw_events_2_norm_enr.json");
    }

    #[test]
    fn stage_patterns() {
        assert_eq!(Stage::Norm.test_number("raw_events_1_norm.json"), Some(1));
        assert_eq!(Stage::Norm.test_number("raw_events_1_norm_enr.json"), None);
        assert_eq!(Stage::NormEnr.test_number("raw_events_12_norm_enr.json"), Some(12));
        assert_eq!(Stage::NormEnrCorr.test_number("raw_events_2_norm_enr_corr.json"), Some(2));
        assert_eq!(Stage::NormEnrCorr.test_number("raw_events_2_norm_enr_corrr.json"), Some(2));
        assert_eq!(
            Stage::NormEnrCorrEnr.test_number("raw_events_2_norm_enr_corr_enr.json"),
            Some(2)
        );
        assert_eq!(Stage::NormEnrCorr.test_number("raw_events_2_norm_enr_corr_enr.json"), None);
        assert_eq!(Stage::Norm.test_number("raw_events_x_norm.json"), None);
    }

    #[test]
    fn stage_names_round_trip_through_patterns() {
        for stage in Stage::ALL {
            assert_eq!(stage.test_number(&stage.file_name(7)), Some(7));
        }
    }

    #[test]
    fn find_by_test_number() {
        let tmp = tempfile::tempdir().unwrap();
        let tests = tmp.path().join("2043-01-26_sdk").join("RuleName").join("tests");
        fs::create_dir_all(&tests).unwrap();
        for name in [
            "raw_events_1_norm_enr_corr.json",
            "raw_events_2_norm_enr_corr.json",
            "raw_events_10_norm_enr_corr.json",
            "raw_events_2_norm_enr.json",
        ] {
            fs::write(tests.join(name), "{}").unwrap();
        }

        let found = find_stage_result(tmp.path(), Stage::NormEnrCorr, 2).unwrap();
        assert_eq!(found, tests.join("raw_events_2_norm_enr_corr.json"));
        let found = find_stage_result(tmp.path(), Stage::NormEnrCorr, 10).unwrap();
        assert_eq!(found, tests.join("raw_events_10_norm_enr_corr.json"));
    }

    #[test]
    fn find_by_rule_name() {
        let tmp = tempfile::tempdir().unwrap();
        for rule in ["Alpha", "Beta"] {
            let tests = tmp.path().join(rule).join("tests");
            fs::create_dir_all(&tests).unwrap();
            fs::write(tests.join("raw_events_1_norm.json"), "{}").unwrap();
        }

        let found = find_rule_stage_result(tmp.path(), "Beta", Stage::Norm, 1).unwrap();
        assert_eq!(found, tmp.path().join("Beta").join("tests").join("raw_events_1_norm.json"));
        let first = find_stage_result(tmp.path(), Stage::Norm, 1).unwrap();
        assert!(first.starts_with(tmp.path().join("Alpha")));
    }

    #[test]
    fn missing_result() {
        let tmp = tempfile::tempdir().unwrap();
        let err = find_stage_result(tmp.path(), Stage::Norm, 1).unwrap_err();
        assert!(matches!(err, DiagError::FixtureNotFound { test: 1, .. }));
        assert!(err.to_string().contains("no norm result file for test 1"));
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let hidden = tmp.path().join(".cache");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("raw_events_1_norm.json"), "{}").unwrap();
        assert!(find_stage_result(tmp.path(), Stage::Norm, 1).is_err());
    }
}
