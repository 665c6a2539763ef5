//! Structured filter → storage predicate compilation.
//!
//! Filters arrive as untrusted JSON. Recognized keys are validated into a [`MemoryFilter`]
//! and rendered as a conjunction of clauses in the engine's predicate grammar. Every string
//! literal goes through [`quote_literal`]; unknown keys are ignored, and an empty filter
//! compiles to `None` (match everything).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{MembankError, Result};

/// Typed view over the recognized filter keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryFilter {
    pub project: Option<String>,
    pub repo: Option<String>,
    pub kind: Option<String>,
    pub scope: Option<String>,
    /// `Some(false)` filters for unpinned rows; `None` means no pinned filter.
    pub pinned: Option<bool>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub tags_any: Vec<String>,
}

/// Double single quotes so a value can never terminate its string literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Predicate selecting a single row by id, used by pin/unpin/delete.
#[must_use]
pub fn id_predicate(id: &str) -> String {
    format!("id = {}", quote_literal(id))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp (RFC 3339, naive `YYYY-MM-DDTHH:MM:SS`, or `YYYY-MM-DD`) as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(MembankError::invalid_filter(
            key,
            format!("expected a string, got {other}"),
        )),
    }
}

fn timestamp_field(map: &Map<String, Value>, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = string_field(map, key)? else {
        return Ok(None);
    };
    parse_timestamp(&raw).map(Some).ok_or_else(|| {
        MembankError::invalid_filter(key, format!("'{raw}' is not an ISO-8601 timestamp"))
    })
}

impl MemoryFilter {
    /// Validate an untrusted filter object. `None`, `null`, and `{}` all mean "no filter".
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        let map = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(MembankError::invalid_filter(
                    "filters",
                    format!("expected an object, got {other}"),
                ));
            }
        };

        let pinned = match map.get("pinned") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(other) => {
                return Err(MembankError::invalid_filter(
                    "pinned",
                    format!("expected a boolean, got {other}"),
                ));
            }
        };

        let tags_any = match map.get("tags_any") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        MembankError::invalid_filter(
                            "tags_any",
                            format!("expected strings, got {item}"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(MembankError::invalid_filter(
                    "tags_any",
                    format!("expected an array of strings, got {other}"),
                ));
            }
        };

        Ok(Self {
            project: string_field(map, "project")?,
            repo: string_field(map, "repo")?,
            kind: string_field(map, "kind")?,
            scope: string_field(map, "scope")?,
            pinned,
            after: timestamp_field(map, "after")?,
            before: timestamp_field(map, "before")?,
            tags_any,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compile().is_none()
    }

    /// Render the filter as an AND-joined predicate, or `None` to match all rows.
    #[must_use]
    pub fn compile(&self) -> Option<String> {
        let mut clauses: Vec<String> = Vec::new();

        for (column, value) in [
            ("project", &self.project),
            ("repo", &self.repo),
            ("kind", &self.kind),
            ("scope", &self.scope),
        ] {
            if let Some(value) = value {
                clauses.push(format!("{column} = {}", quote_literal(value)));
            }
        }

        if let Some(pinned) = self.pinned {
            clauses.push(if pinned {
                "pinned IS TRUE".to_string()
            } else {
                "pinned IS FALSE".to_string()
            });
        }

        if let Some(after) = &self.after {
            clauses.push(format!(
                "created_at >= timestamp {}",
                quote_literal(&format_timestamp(after))
            ));
        }
        if let Some(before) = &self.before {
            clauses.push(format!(
                "created_at <= timestamp {}",
                quote_literal(&format_timestamp(before))
            ));
        }

        if !self.tags_any.is_empty() {
            let items: Vec<String> = self.tags_any.iter().map(|tag| quote_literal(tag)).collect();
            clauses.push(format!("array_has_any(tags, array[{}])", items.join(", ")));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}

/// Validate and compile an untrusted filter object in one step.
pub fn compile_filters(value: Option<&Value>) -> Result<Option<String>> {
    let filter = MemoryFilter::from_value(value)?;
    let predicate = filter.compile();
    tracing::debug!(predicate = predicate.as_deref().unwrap_or(""), "compiled filters");
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_missing_filters_match_everything() {
        assert_eq!(compile_filters(None).unwrap(), None);
        assert_eq!(compile_filters(Some(&Value::Null)).unwrap(), None);
        assert_eq!(compile_filters(Some(&json!({}))).unwrap(), None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(
            compile_filters(Some(&json!({"colour": "blue", "limit": 3}))).unwrap(),
            None
        );
        assert_eq!(
            compile_filters(Some(&json!({"colour": "blue", "repo": "r"}))).unwrap(),
            Some("repo = 'r'".to_string())
        );
    }

    #[test]
    fn clauses_are_conjoined_in_fixed_order() {
        let predicate = compile_filters(Some(&json!({
            "scope": "repo",
            "kind": "adr",
            "repo": "core",
            "project": "atlas",
            "pinned": true,
        })))
        .unwrap()
        .unwrap();
        assert_eq!(
            predicate,
            concat!(
                "project = 'atlas' AND repo = 'core' AND kind = 'adr' ",
                "AND scope = 'repo' AND pinned IS TRUE"
            )
        );
    }

    #[test]
    fn pinned_false_is_distinct_from_unset() {
        assert_eq!(
            compile_filters(Some(&json!({"pinned": false}))).unwrap(),
            Some("pinned IS FALSE".to_string())
        );
        assert_eq!(compile_filters(Some(&json!({"pinned": null}))).unwrap(), None);
    }

    #[test]
    fn single_quotes_are_doubled() {
        let predicate = compile_filters(Some(&json!({"project": "o'brien"})))
            .unwrap()
            .unwrap();
        assert_eq!(predicate, "project = 'o''brien'");
    }

    #[test]
    fn injection_attempt_stays_inside_the_literal() {
        let predicate = compile_filters(Some(&json!({"repo": "x' OR '1'='1"})))
            .unwrap()
            .unwrap();
        assert_eq!(predicate, "repo = 'x'' OR ''1''=''1'");
    }

    #[test]
    fn date_range_is_normalized() {
        let predicate = compile_filters(Some(&json!({
            "after": "2024-01-01",
            "before": "2024-02-01T12:30:00+02:00",
        })))
        .unwrap()
        .unwrap();
        assert_eq!(
            predicate,
            concat!(
                "created_at >= timestamp '2024-01-01T00:00:00.000000Z' ",
                "AND created_at <= timestamp '2024-02-01T10:30:00.000000Z'"
            )
        );
    }

    #[test]
    fn tags_any_renders_array_membership() {
        let predicate = compile_filters(Some(&json!({"tags_any": ["rust", "it's"]})))
            .unwrap()
            .unwrap();
        assert_eq!(predicate, "array_has_any(tags, array['rust', 'it''s'])");
        assert_eq!(compile_filters(Some(&json!({"tags_any": []}))).unwrap(), None);
    }

    #[test]
    fn malformed_values_are_bad_input() {
        for filters in [
            json!({"pinned": "yes"}),
            json!({"project": 7}),
            json!({"after": "last tuesday"}),
            json!({"tags_any": "rust"}),
            json!({"tags_any": [1, 2]}),
            json!(["project"]),
        ] {
            let err = compile_filters(Some(&filters)).unwrap_err();
            assert!(err.is_bad_input(), "{filters} -> {err}");
        }
    }

    #[test]
    fn id_predicate_escapes() {
        assert_eq!(id_predicate("a'b"), "id = 'a''b'");
    }
}
