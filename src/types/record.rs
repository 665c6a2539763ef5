//! The persisted memory record and the partial updates applied to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical persisted entity, one live row per `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Primary identity; equals `hash` unless an import source supplied its own id.
    pub id: String,
    /// Hex-encoded 16-byte canonical digest, the merge key.
    pub hash: String,
    pub content: String,
    /// Embedding owned by the embedding collaborator; absent until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub rel_path: Option<String>,
    /// Display order is preserved; identity ignores order and case.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Advisory expiry in seconds. Stored, never enforced.
    #[serde(default)]
    pub ttl_sec: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_orig: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl MemoryRecord {
    /// Minimal record with identity, content, and both timestamps set to `now`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        hash: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            hash: hash.into(),
            content: content.into(),
            vector: None,
            kind: None,
            scope: None,
            project: None,
            repo: None,
            rel_path: None,
            tags: None,
            pinned: false,
            created_at: now,
            updated_at: now,
            ttl_sec: None,
            external_source: None,
            external_id: None,
            external_url: None,
            author: None,
            created_at_orig: None,
            metadata: None,
        }
    }

    /// Names of the optional import-only columns this record carries a value for.
    #[must_use]
    pub fn populated_extended_columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::new();
        if self.external_source.is_some() {
            columns.push("external_source");
        }
        if self.external_id.is_some() {
            columns.push("external_id");
        }
        if self.external_url.is_some() {
            columns.push("external_url");
        }
        if self.author.is_some() {
            columns.push("author");
        }
        if self.created_at_orig.is_some() {
            columns.push("created_at_orig");
        }
        if self.metadata.is_some() {
            columns.push("metadata");
        }
        columns
    }

    /// Copy of the record with the embedding removed.
    #[must_use]
    pub fn without_vector(mut self) -> Self {
        self.vector = None;
        self
    }
}

/// Field-level partial update applied by id. Only named fields are touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub pinned: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
    #[must_use]
    pub fn pinned(pinned: bool, now: DateTime<Utc>) -> Self {
        Self {
            pinned: Some(pinned),
            updated_at: Some(now),
        }
    }

    /// Apply the patch in place, keeping `updated_at >= created_at`.
    pub fn apply(&self, record: &mut MemoryRecord) {
        if let Some(pinned) = self.pinned {
            record.pinned = pinned;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at.max(record.created_at);
        }
    }
}
