//! Parser and evaluator for the table's predicate grammar.
//!
//! ```text
//! predicate := clause ( AND clause )*
//! clause    := column = 'literal'
//!            | column IS TRUE | column IS FALSE
//!            | column (>= | <= | > | <) timestamp 'iso-8601'
//!            | array_has_any(column, array['literal', ...])
//! ```
//!
//! Literals are single-quoted with `''` as the escape for a quote. Keywords are
//! case-insensitive; column names are not.

use std::iter::Peekable;
use std::str::Chars;

use chrono::{DateTime, Utc};

use crate::error::{MembankError, Result};
use crate::filter::parse_timestamp;
use crate::types::MemoryRecord;

const STRING_COLUMNS: &[&str] = &[
    "id",
    "hash",
    "content",
    "kind",
    "scope",
    "project",
    "repo",
    "rel_path",
    "external_source",
    "external_id",
    "external_url",
    "author",
];
const BOOL_COLUMNS: &[&str] = &["pinned"];
const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "created_at_orig"];
const LIST_COLUMNS: &[&str] = &["tags"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(String),
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq { column: String, value: String },
    IsBool { column: String, value: bool },
    Compare {
        column: String,
        op: CompareOp,
        value: DateTime<Utc>,
    },
    ArrayHasAny { column: String, values: Vec<String> },
}

/// Parsed conjunction of clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

fn malformed(reason: impl Into<String>) -> MembankError {
    MembankError::Predicate {
        reason: reason.into(),
    }
}

fn read_literal(chars: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('\'') => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return Ok(out);
                }
            }
            Some(c) => out.push(c),
            None => return Err(malformed("unterminated string literal")),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Literal(read_literal(&mut chars)?));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '>' | '<' => {
                chars.next();
                let inclusive = chars.peek() == Some(&'=');
                if inclusive {
                    chars.next();
                }
                tokens.push(match (c, inclusive) {
                    ('>', true) => Token::Ge,
                    ('>', false) => Token::Gt,
                    (_, true) => Token::Le,
                    (_, false) => Token::Lt,
                });
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(malformed(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.next() {
            Some(token) if &token == expected => Ok(()),
            other => Err(malformed(format!("expected {expected:?}, found {other:?}"))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next() {
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(malformed(format!("expected {keyword}, found {other:?}"))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(ident)) => Ok(ident),
            other => Err(malformed(format!("expected a column name, found {other:?}"))),
        }
    }

    fn literal(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(value),
            other => Err(malformed(format!("expected a string literal, found {other:?}"))),
        }
    }

    fn column(&mut self, allowed: &[&str]) -> Result<String> {
        let column = self.ident()?;
        if allowed.contains(&column.as_str()) {
            Ok(column)
        } else {
            Err(malformed(format!("unsupported column '{column}' in clause")))
        }
    }

    fn clause(&mut self) -> Result<Clause> {
        let head = self.ident()?;
        if head.eq_ignore_ascii_case("array_has_any") {
            self.expect(&Token::LParen)?;
            let column = self.column(LIST_COLUMNS)?;
            self.expect(&Token::Comma)?;
            self.expect_keyword("array")?;
            self.expect(&Token::LBracket)?;
            let mut values = Vec::new();
            loop {
                values.push(self.literal()?);
                match self.next() {
                    Some(Token::Comma) => {}
                    Some(Token::RBracket) => break,
                    other => return Err(malformed(format!("expected ',' or ']', found {other:?}"))),
                }
            }
            self.expect(&Token::RParen)?;
            return Ok(Clause::ArrayHasAny { column, values });
        }

        match self.next() {
            Some(Token::Eq) => {
                if !STRING_COLUMNS.contains(&head.as_str()) {
                    return Err(malformed(format!("'{head}' is not a string column")));
                }
                Ok(Clause::Eq {
                    column: head,
                    value: self.literal()?,
                })
            }
            Some(Token::Ident(keyword)) if keyword.eq_ignore_ascii_case("is") => {
                if !BOOL_COLUMNS.contains(&head.as_str()) {
                    return Err(malformed(format!("'{head}' is not a boolean column")));
                }
                let value = match self.ident()? {
                    v if v.eq_ignore_ascii_case("true") => true,
                    v if v.eq_ignore_ascii_case("false") => false,
                    other => {
                        return Err(malformed(format!("expected TRUE or FALSE, found {other}")));
                    }
                };
                Ok(Clause::IsBool {
                    column: head,
                    value,
                })
            }
            Some(token @ (Token::Ge | Token::Le | Token::Gt | Token::Lt)) => {
                if !TIMESTAMP_COLUMNS.contains(&head.as_str()) {
                    return Err(malformed(format!("'{head}' is not a timestamp column")));
                }
                let op = match token {
                    Token::Ge => CompareOp::Ge,
                    Token::Le => CompareOp::Le,
                    Token::Gt => CompareOp::Gt,
                    _ => CompareOp::Lt,
                };
                self.expect_keyword("timestamp")?;
                let raw = self.literal()?;
                let value = parse_timestamp(&raw)
                    .ok_or_else(|| malformed(format!("invalid timestamp literal '{raw}'")))?;
                Ok(Clause::Compare {
                    column: head,
                    op,
                    value,
                })
            }
            other => Err(malformed(format!("unexpected {other:?} after '{head}'"))),
        }
    }
}

fn string_column<'a>(record: &'a MemoryRecord, column: &str) -> Option<&'a str> {
    match column {
        "id" => Some(record.id.as_str()),
        "hash" => Some(record.hash.as_str()),
        "content" => Some(record.content.as_str()),
        "kind" => record.kind.as_deref(),
        "scope" => record.scope.as_deref(),
        "project" => record.project.as_deref(),
        "repo" => record.repo.as_deref(),
        "rel_path" => record.rel_path.as_deref(),
        "external_source" => record.external_source.as_deref(),
        "external_id" => record.external_id.as_deref(),
        "external_url" => record.external_url.as_deref(),
        "author" => record.author.as_deref(),
        _ => None,
    }
}

fn timestamp_column(record: &MemoryRecord, column: &str) -> Option<DateTime<Utc>> {
    match column {
        "created_at" => Some(record.created_at),
        "updated_at" => Some(record.updated_at),
        "created_at_orig" => record.created_at_orig,
        _ => None,
    }
}

impl Clause {
    fn matches(&self, record: &MemoryRecord) -> bool {
        match self {
            Self::Eq { column, value } => string_column(record, column) == Some(value.as_str()),
            Self::IsBool { value, .. } => record.pinned == *value,
            Self::Compare { column, op, value } => {
                timestamp_column(record, column).is_some_and(|ts| match op {
                    CompareOp::Ge => ts >= *value,
                    CompareOp::Le => ts <= *value,
                    CompareOp::Gt => ts > *value,
                    CompareOp::Lt => ts < *value,
                })
            }
            Self::ArrayHasAny { values, .. } => record
                .tags
                .as_deref()
                .is_some_and(|tags| tags.iter().any(|tag| values.contains(tag))),
        }
    }
}

impl Predicate {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(malformed("empty predicate"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let mut clauses = vec![parser.clause()?];
        while parser.pos < parser.tokens.len() {
            parser.expect_keyword("and")?;
            clauses.push(parser.clause()?);
        }
        Ok(Self { clauses })
    }

    /// Parse an optional predicate; `None` matches every row.
    pub fn parse_optional(input: Option<&str>) -> Result<Option<Self>> {
        input.map(Self::parse).transpose()
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{compile_filters, id_predicate};
    use chrono::TimeZone;
    use serde_json::json;

    fn record(project: &str) -> MemoryRecord {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut record = MemoryRecord::new("id-1", "hash-1", "content", now);
        record.project = Some(project.to_string());
        record.tags = Some(vec!["rust".into(), "db".into()]);
        record
    }

    #[test]
    fn quoted_literal_round_trips_through_parser() {
        let predicate = compile_filters(Some(&json!({"project": "o'brien"})))
            .unwrap()
            .unwrap();
        let parsed = Predicate::parse(&predicate).unwrap();
        assert_eq!(
            parsed.clauses(),
            &[Clause::Eq {
                column: "project".into(),
                value: "o'brien".into(),
            }]
        );
        assert!(parsed.matches(&record("o'brien")));
        assert!(!parsed.matches(&record("o")));
        assert!(!parsed.matches(&record("obrien")));
    }

    #[test]
    fn injection_payload_is_a_single_literal() {
        let filters = json!({"project": "x' OR pinned IS FALSE OR project = 'y"});
        let predicate = compile_filters(Some(&filters)).unwrap().unwrap();
        let parsed = Predicate::parse(&predicate).unwrap();
        assert_eq!(parsed.clauses().len(), 1);
        assert!(!parsed.matches(&record("y")));
        assert!(parsed.matches(&record("x' OR pinned IS FALSE OR project = 'y")));
    }

    #[test]
    fn compiled_filters_evaluate() {
        let predicate = compile_filters(Some(&json!({
            "project": "atlas",
            "pinned": false,
            "after": "2024-02-01",
            "before": "2024-03-02",
            "tags_any": ["db", "python"],
        })))
        .unwrap()
        .unwrap();
        let parsed = Predicate::parse(&predicate).unwrap();
        assert!(parsed.matches(&record("atlas")));

        let mut pinned = record("atlas");
        pinned.pinned = true;
        assert!(!parsed.matches(&pinned));

        let mut untagged = record("atlas");
        untagged.tags = None;
        assert!(!parsed.matches(&untagged));
    }

    #[test]
    fn id_predicate_parses() {
        let parsed = Predicate::parse(&id_predicate("id-1")).unwrap();
        assert!(parsed.matches(&record("p")));
    }

    #[test]
    fn malformed_predicates_are_rejected() {
        for input in [
            "",
            "project = 'open",
            "project = atlas",
            "pinned = 'true'",
            "project IS TRUE",
            "created_at >= '2024-01-01'",
            "project = 'a' OR repo = 'b'",
            "array_has_any(tags, array[])",
            "nonsense = 'x'",
        ] {
            assert!(Predicate::parse(input).is_err(), "{input}");
        }
    }
}
