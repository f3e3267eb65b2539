//! Output dialects of the rule compilers and test runners.
//!
//! Each tool prints its errors in its own textual shape. A [`Dialect`] turns
//! that text into [`Diagnostic`]s addressed against the rule source, and
//! [`parse_build_log`] reads the knowledge-base build log into a
//! [`BuildReport`] with per-file diagnostics and failed test numbers.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::diagnostic::{Diagnostic, FileDiagnostics};
use crate::error::Result;
use crate::position::correct_whitespace_columns;

// =============================================================================
// Patterns
// =============================================================================

static CORRELATION_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[ERROR\] Compilation failed:\s*(\S+?):(\d+):(\d+):([\S ]+)").expect("valid regex")
});

static NORMALIZATION_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[ERROR\] (.*)").expect("valid regex"));

static GRAPH_COMPILE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Failed to compile graph:\s*(.+?):(\d+):(\d+): (.*)").expect("valid regex")
});

static BUILD_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"BUILD_RULES \[Err\] :: (\S+?):(\d+):(\d+):([\S ]+)").expect("valid regex")
});

static FAILED_TEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"TEST_RULES :: Test Started: tests\\raw_events_(\d+)\.json\s+TEST_RULES :: Expected results are not obtained\.",
    )
    .expect("valid regex")
});

const WARNING_PREFIX: &str = "warning: ";

// =============================================================================
// Dialects
// =============================================================================

/// Which tool produced the output being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Correlation-rule compiler: `[ERROR] Compilation failed: <file>:<line>:<col>: <msg>`.
    Correlation,
    /// Normalization-rule compiler: a bare `[ERROR] <msg>` and/or
    /// `Failed to compile graph: <file>:<line>:<col>: <msg>`.
    Normalization,
}

impl Dialect {
    /// Extract every diagnostic this dialect recognises in `output`.
    ///
    /// Columns are reported as the tool printed them; run
    /// [`correct_whitespace_columns`] against the rule source afterwards.
    pub fn parse(&self, output: &str) -> Vec<Diagnostic> {
        match self {
            Dialect::Correlation => parse_correlation(output),
            Dialect::Normalization => parse_normalization(output),
        }
    }

    /// Parse `output` and correct the columns against the rule `source`.
    pub fn parse_with_source(&self, output: &str, source: &str) -> Result<Vec<Diagnostic>> {
        correct_whitespace_columns(source, self.parse(output))
    }
}

/// Parse a decimal capture, saturating on overflow.
fn number(text: &str) -> usize {
    text.parse().unwrap_or(usize::MAX)
}

fn parse_correlation(output: &str) -> Vec<Diagnostic> {
    CORRELATION_ERROR
        .captures_iter(output)
        .map(|caps| {
            // The compiler counts lines from 1 and columns from 0.
            let line = number(&caps[2]).saturating_sub(1);
            let column = number(&caps[3]);
            Diagnostic::error(line, column, caps[4].trim())
        })
        .collect()
}

fn parse_normalization(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Some(caps) = NORMALIZATION_ERROR.captures(output) {
        diagnostics.push(Diagnostic::error(0, 0, caps[1].trim()));
    }

    // Graph compiler positions are passed through as printed.
    if let Some(caps) = GRAPH_COMPILE_ERROR.captures(output) {
        diagnostics.push(Diagnostic::error(
            number(&caps[2]),
            number(&caps[3]),
            caps[4].trim(),
        ));
    }

    diagnostics
}

// =============================================================================
// Build log
// =============================================================================

/// Everything the knowledge-base build log says about a build-and-test run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Diagnostics grouped by rule file, in order of first appearance.
    pub files: Vec<FileDiagnostics>,
    /// Numbers of the tests whose expected results were not obtained.
    pub failed_tests: Vec<usize>,
}

impl BuildReport {
    /// `false` iff any file has an error-severity diagnostic.
    pub fn status(&self) -> bool {
        !self.files.iter().any(FileDiagnostics::has_errors)
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().map(FileDiagnostics::error_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(FileDiagnostics::warning_count).sum()
    }

    /// Correct columns of every file whose source can be read.
    ///
    /// Files that do not exist on disk are left as reported.
    pub fn correct_columns(&mut self) -> Result<()> {
        for file in &mut self.files {
            if !file.path.is_file() {
                log::debug!("skipping column correction for {}", file.path.display());
                continue;
            }
            let source = std::fs::read_to_string(&file.path)?;
            let diagnostics = std::mem::take(&mut file.diagnostics);
            file.diagnostics = correct_whitespace_columns(&source, diagnostics)?;
        }
        Ok(())
    }

    fn file_mut(&mut self, path: &Path) -> &mut FileDiagnostics {
        let index = match self.files.iter().position(|f| f.path == path) {
            Some(i) => i,
            None => {
                self.files.push(FileDiagnostics {
                    path: path.to_path_buf(),
                    diagnostics: Vec::new(),
                });
                self.files.len() - 1
            }
        };
        &mut self.files[index]
    }
}

/// Read a build log into a [`BuildReport`].
pub fn parse_build_log(output: &str) -> BuildReport {
    let mut report = BuildReport::default();

    for caps in BUILD_ERROR.captures_iter(output) {
        let path = PathBuf::from(caps[1].trim());
        let line = number(&caps[2]).saturating_sub(1);
        let column = number(&caps[3]);
        let message = caps[4].trim();

        let diagnostic = match message.strip_prefix(WARNING_PREFIX) {
            Some(rest) => Diagnostic::warning(line, column, rest),
            None => Diagnostic::error(line, column, message),
        };
        let diagnostic = diagnostic.with_file(&path);
        report.file_mut(&path).diagnostics.push(diagnostic);
    }

    report.failed_tests = FAILED_TEST
        .captures_iter(output)
        .map(|caps| number(&caps[1]))
        .collect();

    log::debug!(
        "build log: {} error(s), {} warning(s), {} failed test(s)",
        report.error_count(),
        report.warning_count(),
        report.failed_tests.len()
    );
    report
}
