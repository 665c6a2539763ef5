//! Import request options and the reports returned by write/admin operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::schema::IndexSpec;

/// Parameters for a bulk import from a named source adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Adapter key, e.g. `jsonl`, `markdown`, `slack`.
    pub source: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub default_tags: Option<Vec<String>>,
    #[serde(default)]
    pub channel_tag: Option<String>,
    /// Attach vectors from the embedding collaborator before writing.
    #[serde(default, alias = "use_onnx")]
    pub use_embedding: bool,
}

impl ImportSpec {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn default_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn channel_tag(mut self, tag: impl Into<String>) -> Self {
        self.channel_tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn use_embedding(mut self, enabled: bool) -> Self {
        self.use_embedding = enabled;
        self
    }
}

/// Outcome of an import call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Rows successfully upserted across all chunks.
    pub imported: usize,
    /// Adapter name, absent for raw item imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Number of merge-insert batches issued.
    pub batches: usize,
}

/// Outcome of a merge-by-hash upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinReport {
    pub id: String,
    pub pinned: bool,
    /// Rows touched; zero when the id does not exist.
    pub matched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub id: String,
    pub deleted: bool,
    pub matched: usize,
}

/// Indexes created by an ensure pass versus those already present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub created: Vec<IndexSpec>,
    pub existing: Vec<IndexSpec>,
}

impl IndexReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Columns added by a schema evolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub added: Vec<String>,
    pub reindexed: IndexReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub table: String,
    pub rows: usize,
}
