//! Table schema and index descriptors shared by the schema manager and storage engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical column type of the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Utf8,
    Bool,
    Int64,
    Timestamp,
    Vector,
    Utf8List,
    Utf8Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    #[must_use]
    pub fn required(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Columns every record table starts with.
    #[must_use]
    pub fn base() -> Self {
        use ColumnType::{Bool, Int64, Timestamp, Utf8, Utf8List, Vector};
        Self {
            columns: vec![
                ColumnSpec::required("id", Utf8),
                ColumnSpec::required("hash", Utf8),
                ColumnSpec::required("content", Utf8),
                ColumnSpec::nullable("vector", Vector),
                ColumnSpec::nullable("kind", Utf8),
                ColumnSpec::nullable("scope", Utf8),
                ColumnSpec::nullable("project", Utf8),
                ColumnSpec::nullable("repo", Utf8),
                ColumnSpec::nullable("rel_path", Utf8),
                ColumnSpec::nullable("tags", Utf8List),
                ColumnSpec::required("pinned", Bool),
                ColumnSpec::required("created_at", Timestamp),
                ColumnSpec::required("updated_at", Timestamp),
                ColumnSpec::nullable("ttl_sec", Int64),
            ],
        }
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }
}

/// Optional provenance/metadata columns added by schema evolution.
#[must_use]
pub fn extended_columns() -> Vec<ColumnSpec> {
    use ColumnType::{Timestamp, Utf8, Utf8Map};
    vec![
        ColumnSpec::nullable("external_source", Utf8),
        ColumnSpec::nullable("external_id", Utf8),
        ColumnSpec::nullable("external_url", Utf8),
        ColumnSpec::nullable("author", Utf8),
        ColumnSpec::nullable("created_at_orig", Timestamp),
        ColumnSpec::nullable("metadata", Utf8Map),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// ANN index over the embedding column (cosine).
    Vector,
    /// BM25 full-text index.
    FullText,
    /// Equality/range index over a scalar column.
    Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexSpec {
    pub column: String,
    pub kind: IndexKind,
}

impl IndexSpec {
    #[must_use]
    pub fn vector(column: &str) -> Self {
        Self {
            column: column.to_string(),
            kind: IndexKind::Vector,
        }
    }

    #[must_use]
    pub fn full_text(column: &str) -> Self {
        Self {
            column: column.to_string(),
            kind: IndexKind::FullText,
        }
    }

    #[must_use]
    pub fn scalar(column: &str) -> Self {
        Self {
            column: column.to_string(),
            kind: IndexKind::Scalar,
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IndexKind::Vector => "vector",
            IndexKind::FullText => "fts",
            IndexKind::Scalar => "scalar",
        };
        write!(f, "{kind}({})", self.column)
    }
}
