//! The storage boundary the record store is written against.

use crate::error::Result;
use crate::types::{
    ColumnSpec, IndexSpec, MemoryRecord, RecordPatch, SearchEngineKind, TableSchema,
};

/// Counts from one merge-insert call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub updated: usize,
}

impl MergeOutcome {
    #[must_use]
    pub fn rows(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Ranked search request handed to the engine. `predicate` is in the engine grammar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSearch {
    pub query: String,
    pub predicate: Option<String>,
    pub limit: usize,
    pub rerank: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<ScoredRecord>,
    pub engine: SearchEngineKind,
}

/// Columnar table with merge-by-hash upsert, predicate updates, and hybrid search.
///
/// Implementations must apply each `merge_insert` batch atomically: either every row is
/// visible afterwards or none is.
pub trait RecordTable: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> Result<TableSchema>;

    /// Add nullable columns. Existing rows read the new columns as null.
    fn add_columns(&self, columns: &[ColumnSpec]) -> Result<()>;

    /// Upsert keyed on `hash`. Matched rows keep their stored `id`, `hash`, and earliest
    /// `created_at`; every other field is replaced.
    fn merge_insert(&self, rows: Vec<MemoryRecord>) -> Result<MergeOutcome>;

    /// Apply `patch` to every row matching `predicate`; returns the number of rows touched.
    fn update_where(&self, predicate: &str, patch: &RecordPatch) -> Result<usize>;

    fn delete_where(&self, predicate: &str) -> Result<usize>;

    fn count_rows(&self, predicate: Option<&str>) -> Result<usize>;

    /// Unranked read of up to `limit` matching rows, newest first.
    fn select(&self, predicate: Option<&str>, limit: usize) -> Result<Vec<MemoryRecord>>;

    fn list_indexes(&self) -> Result<Vec<IndexSpec>>;

    /// Create or rebuild an index. Callers check [`RecordTable::list_indexes`] first when
    /// they want create-if-missing semantics.
    ///
    /// [`InMemoryTable`](super::InMemoryTable) only records `spec` in its index list: it scans rows
    /// for filters and keeps its full-text index current on every search regardless.
    fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    fn search(&self, request: &TableSearch) -> Result<SearchOutcome>;

    /// Persist pending state. A no-op for ephemeral tables.
    fn flush(&self) -> Result<()>;
}
