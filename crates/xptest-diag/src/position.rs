//! Line lookups in rule source and column correction for diagnostics.
//!
//! Tools report the column of the token they choked on, which often lands on
//! the indentation of the offending line. Correction moves the column to the
//! first non-whitespace character so the whole statement gets highlighted.

use crate::diagnostic::Diagnostic;
use crate::error::{DiagError, Result};

/// A pre-computed line index for fast line → text lookups.
pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    /// Get the byte range for a full line (excluding the line break).
    pub fn line_range(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.text.len());
        Some((start, end))
    }

    /// The text of `line` without its line break.
    pub fn line(&self, line: usize) -> Option<&'a str> {
        let (start, end) = self.line_range(line)?;
        Some(self.text[start..end].trim_end_matches('\r'))
    }

    /// Total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Index of the first non-whitespace character of `line`, in characters.
pub fn first_non_whitespace(line: &str) -> Option<usize> {
    line.chars().position(|c| !c.is_whitespace())
}

/// Move each diagnostic's column to the first non-whitespace character of its
/// line in `source`.
///
/// Lines made only of whitespace keep their column. A diagnostic whose line
/// lies past the end of `source` is an error. An empty `source` leaves the
/// diagnostics untouched.
pub fn correct_whitespace_columns(
    source: &str,
    diagnostics: Vec<Diagnostic>,
) -> Result<Vec<Diagnostic>> {
    if source.is_empty() {
        return Ok(diagnostics);
    }

    let index = LineIndex::new(source);
    diagnostics
        .into_iter()
        .map(|mut d| {
            let line = index.line(d.line).ok_or(DiagError::LineOutOfRange {
                line: d.line,
                line_count: index.line_count(),
            })?;
            if let Some(column) = first_non_whitespace(line) {
                d.column = column;
            }
            Ok(d)
        })
        .collect()
}
