//! Line diff of pretty-printed JSON values.

use serde_json::Value;
use xptest_codec::{sort_top_level_keys, to_pretty_json};

/// One line of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

impl DiffLine<'_> {
    fn sign(&self) -> char {
        match self {
            DiffLine::Same(_) => ' ',
            DiffLine::Removed(_) => '-',
            DiffLine::Added(_) => '+',
        }
    }

    fn text(&self) -> &str {
        match self {
            DiffLine::Same(t) | DiffLine::Removed(t) | DiffLine::Added(t) => t,
        }
    }
}

/// Longest-common-subsequence diff of two line sequences.
///
/// Removals are emitted before additions within each changed hunk.
pub fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffLine<'a>> {
    let (n, m) = (old.len(), new.len());
    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::Same(old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(old[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|&l| DiffLine::Removed(l)));
    out.extend(new[j..].iter().map(|&l| DiffLine::Added(l)));
    out
}

/// Render diff lines as `<sign><line>\n`, skipping empty lines.
pub fn render(lines: &[DiffLine<'_>]) -> String {
    let mut out = String::new();
    for line in lines.iter().filter(|l| !l.text().is_empty()) {
        out.push(line.sign());
        out.push_str(line.text());
        out.push('\n');
    }
    out
}

/// A rendered diff of two JSON values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDiff {
    pub text: String,
    /// `false` when both values render identically.
    pub changed: bool,
}

/// Diff two JSON values in their sorted pretty form.
pub fn diff_json(expected: &Value, actual: &Value) -> JsonDiff {
    let expected = to_pretty_json(&sort_top_level_keys(expected.clone()));
    let actual = to_pretty_json(&sort_top_level_keys(actual.clone()));

    let old: Vec<&str> = expected.lines().collect();
    let new: Vec<&str> = actual.lines().collect();
    let lines = diff_lines(&old, &new);
    JsonDiff {
        changed: lines.iter().any(|l| !matches!(l, DiffLine::Same(_))),
        text: render(&lines),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_sequences() {
        let lines = diff_lines(&["a", "b"], &["a", "b"]);
        assert_eq!(lines, vec![DiffLine::Same("a"), DiffLine::Same("b")]);
    }

    #[test]
    fn replaced_line() {
        let lines = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(
            lines,
            vec![
                DiffLine::Same("a"),
                DiffLine::Removed("b"),
                DiffLine::Added("x"),
                DiffLine::Same("c"),
            ]
        );
    }

    #[test]
    fn trailing_insertions_and_removals() {
        assert_eq!(
            diff_lines(&["a"], &["a", "b"]),
            vec![DiffLine::Same("a"), DiffLine::Added("b")]
        );
        assert_eq!(
            diff_lines(&["a", "b"], &[]),
            vec![DiffLine::Removed("a"), DiffLine::Removed("b")]
        );
    }

    #[test]
    fn render_signs() {
        let text = render(&[
            DiffLine::Same("{"),
            DiffLine::Removed("x"),
            DiffLine::Added("y"),
            DiffLine::Same(""),
        ]);
        assert_eq!(text, " {\n-x\n+y\n");
    }

    #[test]
    fn json_equal_regardless_of_key_order() {
        let a = json!({"a": 1, "b": "two"});
        let b = json!({"b": "two", "a": 1});
        let diff = diff_json(&a, &b);
        assert!(!diff.changed);
        assert_eq!(diff.text, " {\n     \"a\": 1,\n     \"b\": \"two\"\n }\n");
    }

    #[test]
    fn json_changed_value() {
        let expected = json!({"action": "login", "status": "success"});
        let actual = json!({"action": "login", "status": "failure"});
        let diff = diff_json(&expected, &actual);
        assert!(diff.changed);
        assert_eq!(
            diff.text,
            " {\n     \"action\": \"login\",\n-    \"status\": \"success\"\n+    \"status\": \"failure\"\n }\n"
        );
    }
}
