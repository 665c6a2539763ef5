//! Chunked bulk import into the record store.

use chrono::{DateTime, Utc};
use tracing::instrument;

use super::adapters::ImportSource;
use crate::canonical::resolve_import_identity;
use crate::embed::embed_all;
use crate::error::{MembankError, Result};
use crate::memstore::Membank;
use crate::types::{ImportItem, ImportReport, ImportSpec, MemoryRecord, RawItem};

fn record_from_import(item: ImportItem, now: DateTime<Utc>) -> MemoryRecord {
    let (id, hash) = resolve_import_identity(&item);
    let mut record = MemoryRecord::new(id, hash, item.content, item.created_at.unwrap_or(now));
    record.updated_at = now;
    record.vector = item.vector;
    record.kind = item.kind;
    record.scope = item.scope;
    record.project = item.project;
    record.repo = item.repo;
    record.rel_path = item.rel_path;
    record.tags = item.tags;
    record.pinned = item.pinned;
    record.ttl_sec = item.ttl_sec;
    record.external_source = item.external_source;
    record.external_id = item.external_id;
    record.external_url = item.external_url;
    record.author = item.author;
    record.created_at_orig = item.created_at_orig;
    record.metadata = item.metadata;
    record
}

fn record_from_raw(item: RawItem, now: DateTime<Utc>) -> MemoryRecord {
    let mut record = MemoryRecord::new(
        item.id,
        item.hash,
        item.content,
        item.created_at.unwrap_or(now),
    );
    record.updated_at = item.updated_at.unwrap_or(now);
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
    /// Load items from a named source, optionally embed them, and upsert in chunks.
    ///
    /// An unknown source name fails before anything is read. Chunks are written in order;
    /// a failing chunk aborts the import and earlier chunks stay committed.
    #[instrument(skip(self, spec), fields(source = %spec.source))]
    pub fn import(&self, spec: &ImportSpec) -> Result<ImportReport> {
        let source: ImportSource = spec.source.parse()?;
        let items = source.adapter().load(spec)?;

        let now = Utc::now();
        let mut rows: Vec<MemoryRecord> = items
            .into_iter()
            .map(|item| record_from_import(item, now))
            .collect();
        if spec.use_embedding {
            self.attach_embeddings(&mut rows);
        }

        let (imported, batches) = self.upsert_chunked(rows)?;
        log::info!("imported {imported} rows from {source} in {batches} batches");
        Ok(ImportReport {
            imported,
            source: Some(source.name().to_string()),
            batches,
        })
    }

    /// Upsert pre-normalized items that already carry their identity.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn import_raw_items(&self, items: Vec<RawItem>) -> Result<ImportReport> {
        if let Some((idx, _)) = items
            .iter()
            .enumerate()
            .find(|(_, item)| item.id.trim().is_empty() || item.hash.trim().is_empty())
        {
            return Err(MembankError::InvalidInput {
                reason: format!("raw item {idx} is missing its id or hash"),
            });
        }

        let now = Utc::now();
        let rows: Vec<MemoryRecord> = items
            .into_iter()
            .map(|item| record_from_raw(item, now))
            .collect();
        let (imported, batches) = self.upsert_chunked(rows)?;
        Ok(ImportReport {
            imported,
            source: None,
            batches,
        })
    }

    /// Embed every row lacking a vector in one call. Failure leaves the rows without vectors.
    fn attach_embeddings(&self, rows: &mut [MemoryRecord]) {
        if !self.embedder.available() {
            tracing::debug!(
                model = self.embedder.model(),
                "embedder unavailable, importing without vectors"
            );
            return;
        }
        let pending: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.vector.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if pending.is_empty() {
            return;
        }

        let embedded = {
            let texts: Vec<&str> = pending.iter().map(|idx| rows[*idx].content.as_str()).collect();
            embed_all(self.embedder.as_ref(), &texts)
        };
        match embedded {
            Ok(vectors) => {
                for (idx, vector) in pending.into_iter().zip(vectors) {
                    rows[idx].vector = Some(vector);
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    rows = pending.len(),
                    "import embedding failed, importing without vectors"
                );
            }
        }
    }

    /// Sequential merge-inserts of `import_chunk_size` rows. Returns `(rows, batches)`.
    fn upsert_chunked(&self, rows: Vec<MemoryRecord>) -> Result<(usize, usize)> {
        let chunk_size = self.config.import_chunk_size.max(1);
        let mut imported = 0;
        let mut batches = 0;
        let mut rows = rows.into_iter().peekable();

        while rows.peek().is_some() {
            let chunk: Vec<MemoryRecord> = rows.by_ref().take(chunk_size).collect();
            let len = chunk.len();
            self.table.merge_insert(chunk)?;
            imported += len;
            batches += 1;
            tracing::debug!(chunk = batches, rows = len, "import chunk committed");
        }
        Ok((imported, batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize_import;

    #[test]
    fn import_rows_take_identity_from_provenance() {
        let now = Utc::now();
        let mut item = ImportItem::new("hello");
        item.external_source = Some("jsonl".into());
        item.external_id = Some("1".into());
        let expected = canonicalize_import(&item).hash;

        let record = record_from_import(item, now);
        assert_eq!(record.hash, expected);
        assert_eq!(record.id, expected);
        assert_eq!(record.created_at, now);
        assert_eq!(record.external_source.as_deref(), Some("jsonl"));
    }

    #[test]
    fn raw_rows_keep_supplied_timestamps() {
        let created = DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let item = RawItem {
            id: "id".into(),
            hash: "hash".into(),
            content: "c".into(),
            project: None,
            repo: None,
            rel_path: None,
            kind: None,
            scope: None,
            tags: None,
            pinned: false,
            created_at: Some(created),
            updated_at: None,
            ttl_sec: None,
        };
        let now = Utc::now();
        let record = record_from_raw(item, now);
        assert_eq!(record.created_at, created);
        assert_eq!(record.updated_at, now);
    }
}
