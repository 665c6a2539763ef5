//! Write path: add, upsert, pin/unpin, delete.

use chrono::{DateTime, Utc};
use tracing::instrument;

use super::lifecycle::Membank;
use crate::canonical::canonicalize;
use crate::error::Result;
use crate::filter::id_predicate;
use crate::types::{
    AddMemoryResponse, DeleteReport, MemoryRecord, NewMemory, PinReport, RecordPatch, UpsertReport,
};

fn record_from_new(item: NewMemory, hash: String, now: DateTime<Utc>) -> MemoryRecord {
    let mut record = MemoryRecord::new(hash.clone(), hash, item.content, now);
    record.kind = item.kind;
    record.scope = item.scope;
    record.project = item.project;
    record.repo = item.repo;
    record.rel_path = item.rel_path;
    record.tags = item.tags;
    record.pinned = item.pinned;
    record.ttl_sec = item.ttl_sec;
    record
}

impl Membank {
    /// Canonicalize and upsert one item. Re-adding the same item updates the existing row.
    #[instrument(skip(self, item), fields(hash))]
    pub fn add(&self, item: NewMemory) -> Result<AddMemoryResponse> {
        let hash = canonicalize(&item).hash;
        tracing::Span::current().record("hash", hash.as_str());

        let record = record_from_new(item, hash.clone(), Utc::now());
        self.table.merge_insert(vec![record])?;
        tracing::debug!(hash = %hash, "memory upserted");

        Ok(AddMemoryResponse {
            id: hash.clone(),
            hash,
            upserted: true,
        })
    }

    /// Merge one fully formed record by `hash`.
    pub fn upsert(&self, record: MemoryRecord) -> Result<UpsertReport> {
        self.upsert_batch(vec![record])
    }

    /// Merge a batch by `hash`. The batch is applied atomically.
    pub fn upsert_batch(&self, records: Vec<MemoryRecord>) -> Result<UpsertReport> {
        let rows = records.len();
        let outcome = self.table.merge_insert(records)?;
        Ok(UpsertReport {
            rows,
            inserted: outcome.inserted,
            updated: outcome.updated,
        })
    }

    pub fn pin(&self, id: &str) -> Result<PinReport> {
        self.set_pinned(id, true)
    }

    pub fn unpin(&self, id: &str) -> Result<PinReport> {
        self.set_pinned(id, false)
    }

    /// Flip the flag by id without rehashing. A missing id matches zero rows.
    fn set_pinned(&self, id: &str, pinned: bool) -> Result<PinReport> {
        let matched = self
            .table
            .update_where(&id_predicate(id), &RecordPatch::pinned(pinned, Utc::now()))?;
        tracing::debug!(id, pinned, matched, "pin state updated");
        Ok(PinReport {
            id: id.to_string(),
            pinned,
            matched,
        })
    }

    pub fn delete(&self, id: &str) -> Result<DeleteReport> {
        let matched = self.table.delete_where(&id_predicate(id))?;
        tracing::debug!(id, matched, "memory deleted");
        Ok(DeleteReport {
            id: id.to_string(),
            deleted: true,
            matched,
        })
    }
}
