//! Public query request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::MemoryRecord;

fn default_true() -> bool {
    true
}

/// Hybrid query over the record table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural language / keyword query. Empty browses newest-first.
    pub q: String,
    /// Maximum hits to return; zero falls back to the configured default.
    #[serde(default)]
    pub limit: usize,
    /// Fuse lexical and semantic rankings with reciprocal rank fusion.
    #[serde(default = "default_true")]
    pub rerank: bool,
    /// Untrusted structured filter: project, repo, kind, scope, pinned, after, before, tags_any.
    #[serde(default)]
    pub filters: Option<Value>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            limit: 0,
            rerank: true,
            filters: None,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Ranking path the engine used to satisfy a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngineKind {
    /// Lexical and semantic rankings combined.
    #[default]
    Hybrid,
    /// No query embedding was available; full-text ranking only.
    Lexical,
    /// Empty query; filtered rows newest-first.
    Browse,
}

/// A single ranked row. The embedding is always stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    #[serde(flatten)]
    pub record: MemoryRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub items: Vec<QueryHit>,
    #[serde(default)]
    pub engine: SearchEngineKind,
}

impl QueryResponse {
    /// Ids of the returned rows in rank order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|hit| hit.record.id.as_str()).collect()
    }
}
