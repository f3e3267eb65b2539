//! Test-code documents.
//!
//! A test-code document drives one integration test run:
//!
//! ```text
//! # mocked lookup tables
//! table_list default
//! table_list {"ESC_Auto_Profile": [{"rule": "X", "auto_profiling": 1}]}
//!
//! expect 1 {"correlation_name": "X", "count": 1}
//! expect not {"correlation_name": "Y"}
//! ```
//!
//! Both the compact and the pretty form parse to the same items; JSON bodies
//! may span several lines.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::Value;

use crate::error::{CodecError, Result};

// ---------------------------------------------------------------------------
// Pest parser (generated from testcode.pest grammar)
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "src/testcode.pest"]
struct TestCodeParser;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// How many events an `expect` clause asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectCount {
    Exactly(u64),
    /// `expect not`: no event of this shape may be produced.
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub count: ExpectCount,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestCodeItem {
    Comment(String),
    TableListDefault,
    TableList(Value),
    Expect(Expectation),
    /// A bare JSON object, as found in normalized-event fixtures.
    Event(Value),
    Text(String),
}

/// A parsed test-code document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestCode {
    pub items: Vec<TestCodeItem>,
}

impl TestCode {
    pub fn parse(input: &str) -> Result<Self> {
        let document = TestCodeParser::parse(Rule::document, input)
            .map_err(|e| CodecError::TestCode(e.to_string()))?
            .next()
            .ok_or_else(|| CodecError::TestCode("empty parse tree".to_string()))?;

        let items = document
            .into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(parse_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(TestCode { items })
    }

    pub fn expectations(&self) -> impl Iterator<Item = &Expectation> {
        self.items.iter().filter_map(|item| match item {
            TestCodeItem::Expect(e) => Some(e),
            _ => None,
        })
    }

    pub fn table_lists(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().filter_map(|item| match item {
            TestCodeItem::TableList(v) => Some(v),
            _ => None,
        })
    }

    /// `true` when the document contains an `expect not` clause.
    pub fn is_negative(&self) -> bool {
        self.expectations().any(|e| e.count == ExpectCount::Not)
    }

    /// The single expected body, if the document has exactly one `expect`
    /// clause.
    pub fn single_expectation(&self) -> Option<&Expectation> {
        let mut iter = self.expectations();
        match (iter.next(), iter.next()) {
            (Some(e), None) => Some(e),
            _ => None,
        }
    }
}

fn parse_item(pair: Pair<'_, Rule>) -> Result<TestCodeItem> {
    let line = pair.as_span().start_pos().line_col().0;
    let item = match pair.as_rule() {
        Rule::comment => TestCodeItem::Comment(pair.as_str().to_string()),
        Rule::table_list_default => TestCodeItem::TableListDefault,
        Rule::table_list => {
            let body = single_inner(pair, line)?;
            TestCodeItem::TableList(parse_json(body.as_str(), line)?)
        }
        Rule::expect => {
            let mut count = ExpectCount::Not;
            let mut body = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::not_kw => count = ExpectCount::Not,
                    Rule::uint => {
                        let n = inner.as_str().parse::<u64>().map_err(|e| {
                            CodecError::TestCode(format!("line {line}: bad expect count: {e}"))
                        })?;
                        count = ExpectCount::Exactly(n);
                    }
                    Rule::json_object => body = Some(parse_json(inner.as_str(), line)?),
                    _ => {}
                }
            }
            let body = body.ok_or_else(|| {
                CodecError::TestCode(format!("line {line}: expect clause without body"))
            })?;
            TestCodeItem::Expect(Expectation { count, body })
        }
        Rule::event => {
            let body = single_inner(pair, line)?;
            TestCodeItem::Event(parse_json(body.as_str(), line)?)
        }
        Rule::text => TestCodeItem::Text(pair.as_str().trim_end().to_string()),
        other => {
            return Err(CodecError::TestCode(format!(
                "line {line}: unexpected rule {other:?}"
            )));
        }
    };
    Ok(item)
}

fn single_inner(pair: Pair<'_, Rule>, line: usize) -> Result<Pair<'_, Rule>> {
    pair.into_inner()
        .next()
        .ok_or_else(|| CodecError::TestCode(format!("line {line}: missing JSON body")))
}

fn parse_json(text: &str, line: usize) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| CodecError::TestCode(format!("line {line}: invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_document() {
        let code = "#4778\ntable_list default\ntable_list {\"T\": [{\"a\": 1}]}\n\nexpect 1 {\"correlation_name\": \"X\"}\n";
        let tc = TestCode::parse(code).unwrap();
        assert_eq!(
            tc.items,
            vec![
                TestCodeItem::Comment("#4778".to_string()),
                TestCodeItem::TableListDefault,
                TestCodeItem::TableList(json!({"T": [{"a": 1}]})),
                TestCodeItem::Expect(Expectation {
                    count: ExpectCount::Exactly(1),
                    body: json!({"correlation_name": "X"}),
                }),
            ]
        );
        assert!(!tc.is_negative());
    }

    #[test]
    fn pretty_document_spans_lines() {
        let code = "expect 2 {\r\n    \"a\": \"}{\",\r\n    \"b\": {\r\n        \"c\": 1\r\n    }\r\n}\t";
        let tc = TestCode::parse(code).unwrap();
        let e = tc.single_expectation().unwrap();
        assert_eq!(e.count, ExpectCount::Exactly(2));
        assert_eq!(e.body, json!({"a": "}{", "b": {"c": 1}}));
    }

    #[test]
    fn expect_not_is_negative() {
        let tc = TestCode::parse("expect not {\"correlation_name\": \"X\"}").unwrap();
        assert!(tc.is_negative());
        assert_eq!(tc.expectations().count(), 1);
    }

    #[test]
    fn bare_events_and_text() {
        let tc = TestCode::parse("{\"a\": 1}\nsome raw line  \n").unwrap();
        assert_eq!(
            tc.items,
            vec![
                TestCodeItem::Event(json!({"a": 1})),
                TestCodeItem::Text("some raw line".to_string()),
            ]
        );
    }

    #[test]
    fn multiple_expectations() {
        let tc = TestCode::parse("expect 1 {\"a\": 1}\nexpect 1 {\"b\": 2}").unwrap();
        assert_eq!(tc.expectations().count(), 2);
        assert!(tc.single_expectation().is_none());
    }

    #[test]
    fn table_lists_are_collected() {
        let tc = TestCode::parse("table_list {\"A\": []}\ntable_list {\"B\": []}\nexpect 1 {}").unwrap();
        let names: Vec<&Value> = tc.table_lists().collect();
        assert_eq!(names, [&json!({"A": []}), &json!({"B": []})]);
    }

    #[test]
    fn invalid_json_body_is_an_error() {
        let err = TestCode::parse("expect 1 {\"a\": }").unwrap_err();
        assert!(matches!(err, CodecError::TestCode(ref m) if m.contains("line 1")));
    }

    #[test]
    fn empty_document() {
        assert!(TestCode::parse("").unwrap().items.is_empty());
        assert!(TestCode::parse("\n\n  \n").unwrap().items.is_empty());
    }
}
