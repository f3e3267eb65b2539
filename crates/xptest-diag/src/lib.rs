//! # xptest-diag
//!
//! Interpretation of what rule compilers and test runners print.
//!
//! Rule tooling reports problems as free text. This crate reads that text
//! back into structured results:
//!
//! - **Diagnostics**: compiler errors addressed to a line and column of the
//!   rule source, for the correlation, normalization and build-log dialects
//! - **Column correction**: moving a reported column to the first token of
//!   its line
//! - **Verdicts**: success, failure with a JSON diff, or unknown
//! - **Fixtures**: test file naming and lookup of per-stage result files
//! - **Sub-rules**: names of the correlation rules a rule filters on
//!
//! ## Architecture
//!
//! - **regex** patterns per dialect, applied to the raw tool output
//! - **xptest-codec** for JSON extraction, test-code parsing and formatting
//! - **serde_yaml** harness configuration with defaults for every key
//!
//! ## Quick Start
//!
//! ```rust
//! use xptest_diag::{Dialect, HarnessConfig, Verdict, classify_verdict};
//!
//! let output = "[ERROR] Compilation failed:\nrule.co:27:29: syntax error, unexpected '='";
//! let diagnostics = Dialect::Correlation.parse(output);
//! assert_eq!(diagnostics[0].line, 26);
//! assert_eq!(diagnostics[0].column, 29);
//!
//! let verdict = classify_verdict("SUCCESS!", "expect 1 {}", &HarnessConfig::default());
//! assert!(matches!(verdict, Verdict::Success(_)));
//! ```

pub mod config;
pub mod diagnostic;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod position;
pub mod subrules;
pub mod verdict;

// Re-export the most commonly used types and functions at crate root
pub use config::{HarnessConfig, parse_config, parse_config_file};
pub use diagnostic::{Diagnostic, FileDiagnostics, Severity};
pub use dialect::{BuildReport, Dialect, parse_build_log};
pub use diff::{JsonDiff, diff_json};
pub use error::{DiagError, Result};
pub use fixtures::{
    Stage, find_rule_stage_result, find_stage_result, raw_events_file_name, test_conds_file_name,
};
pub use position::{LineIndex, correct_whitespace_columns};
pub use subrules::{filter_correlation_events, parse_sub_rule_names, rule_contains_subrules};
pub use verdict::{Verdict, classify_verdict, compare_normalized};
