//! Diagnostics-specific error types.

use thiserror::Error;

/// Errors that can occur while interpreting tool output or locating fixtures.
#[derive(Debug, Error)]
pub enum DiagError {
    /// A diagnostic points past the end of the rule source.
    #[error("diagnostic line {line} is out of range: source has {line_count} line(s)")]
    LineOutOfRange { line: usize, line_count: usize },

    /// An `in_list([...], correlation_name)` array could not be parsed.
    #[error("cannot extract sub-rule names: {0}")]
    SubRuleNames(String),

    /// No intermediate result file matched the requested stage and test.
    #[error("no {stage} result file for test {test} under {dir}")]
    FixtureNotFound {
        stage: String,
        test: usize,
        dir: String,
    },

    /// The harness configuration is not valid.
    #[error("invalid harness config: {0}")]
    Config(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, DiagError>;
