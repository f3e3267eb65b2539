//! Location-addressed findings reported by external tools.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One compiler or test-runner finding, addressed against the rule source.
///
/// `line` and `column` are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    /// Source file named by the tool, when it names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            column,
            message: message.into(),
            severity: Severity::Error,
            file: None,
        }
    }

    pub fn warning(line: usize, column: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(line, column, message)
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file.display())?;
        }
        write!(
            f,
            "{}:{}: {}: {}",
            self.line + 1,
            self.column,
            self.severity,
            self.message
        )
    }
}

/// All diagnostics reported for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiagnostics {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileDiagnostics {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let d = Diagnostic::error(26, 29, "syntax error").with_file("rule.co");
        assert_eq!(d.to_string(), "rule.co:27:29: error: syntax error");
    }

    #[test]
    fn warning_constructor() {
        let d = Diagnostic::warning(0, 0, "unused");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.to_string(), "1:0: warning: unused");
    }

    #[test]
    fn file_counts() {
        let fd = FileDiagnostics {
            path: "rule.co".into(),
            diagnostics: vec![
                Diagnostic::error(0, 0, "a"),
                Diagnostic::warning(1, 0, "b"),
                Diagnostic::warning(2, 0, "c"),
            ],
        };
        assert!(fd.has_errors());
        assert_eq!(fd.error_count(), 1);
        assert_eq!(fd.warning_count(), 2);
    }
}
