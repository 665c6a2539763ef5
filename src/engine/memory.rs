//! In-process reference implementation of [`RecordTable`].
//!
//! Rows live in a map keyed by `hash` behind one `RwLock`. A mutation is applied in place
//! while an undo log records the prior version of every row it touches. On-disk tables then
//! append the mutation's post-image to a [`Journal`]; if the mutation or the append fails,
//! the undo log restores the table, so a batch is all-or-nothing in memory and on disk.
//! The full snapshot is only rewritten at checkpoints.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};

use super::fulltext::LexIndex;
use super::hybrid::{Ranking, cosine_similarity, reciprocal_rank_fusion, weighted_merge};
use super::journal::Journal;
use super::predicate::Predicate;
use super::table::{MergeOutcome, RecordTable, ScoredRecord, SearchOutcome, TableSearch};
use crate::constants::{RRF_K, SEMANTIC_WEIGHT};
use crate::embed::{Embedder, embed_all};
use crate::error::{MembankError, Result};
use crate::types::{
    ColumnSpec, IndexSpec, MemoryRecord, RecordPatch, SearchEngineKind, TableSchema,
};

#[derive(Debug, Serialize, Deserialize)]
struct TableState {
    schema: TableSchema,
    rows: BTreeMap<String, MemoryRecord>,
    indexes: BTreeSet<IndexSpec>,
    /// Last journal sequence folded into this state.
    #[serde(default)]
    sequence: u64,
    /// Bumped on every content change; the lexical index is rebuilt when it lags behind.
    #[serde(skip)]
    generation: u64,
}

impl TableState {
    fn new() -> Self {
        Self {
            schema: TableSchema::base(),
            rows: BTreeMap::new(),
            indexes: BTreeSet::new(),
            sequence: 0,
            generation: 0,
        }
    }
}

/// Post-image of one committed mutation, as written to the journal.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TableDelta {
    /// `None` marks a deleted row.
    #[serde(default)]
    rows: BTreeMap<String, Option<MemoryRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<TableSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indexes: Option<BTreeSet<IndexSpec>>,
}

impl TableDelta {
    fn apply(self, state: &mut TableState) {
        for (hash, row) in self.rows {
            match row {
                Some(row) => state.rows.insert(hash, row),
                None => state.rows.remove(&hash),
            };
        }
        if let Some(schema) = self.schema {
            state.schema = schema;
        }
        if let Some(indexes) = self.indexes {
            state.indexes = indexes;
        }
    }
}

/// Prior values of everything a mutation touched, kept until the mutation is durable.
#[derive(Debug, Default)]
struct UndoLog {
    rows: Vec<(String, Option<MemoryRecord>)>,
    schema: Option<TableSchema>,
    indexes: Option<BTreeSet<IndexSpec>>,
}

impl UndoLog {
    fn put(&mut self, state: &mut TableState, row: MemoryRecord) {
        let hash = row.hash.clone();
        let prior = state.rows.insert(hash.clone(), row);
        self.rows.push((hash, prior));
    }

    fn remove(&mut self, state: &mut TableState, hash: &str) {
        if let Some(prior) = state.rows.remove(hash) {
            self.rows.push((hash.to_string(), Some(prior)));
        }
    }

    fn schema_mut<'a>(&mut self, state: &'a mut TableState) -> &'a mut TableSchema {
        if self.schema.is_none() {
            self.schema = Some(state.schema.clone());
        }
        &mut state.schema
    }

    fn indexes_mut<'a>(&mut self, state: &'a mut TableState) -> &'a mut BTreeSet<IndexSpec> {
        if self.indexes.is_none() {
            self.indexes = Some(state.indexes.clone());
        }
        &mut state.indexes
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.schema.is_none() && self.indexes.is_none()
    }

    fn delta(&self, state: &TableState) -> TableDelta {
        TableDelta {
            rows: self
                .rows
                .iter()
                .map(|(hash, _)| (hash.clone(), state.rows.get(hash).cloned()))
                .collect(),
            schema: self.schema.as_ref().map(|_| state.schema.clone()),
            indexes: self.indexes.as_ref().map(|_| state.indexes.clone()),
        }
    }

    fn revert(self, state: &mut TableState) {
        // Newest first, so a hash touched twice ends at its original value.
        for (hash, prior) in self.rows.into_iter().rev() {
            match prior {
                Some(row) => state.rows.insert(hash, row),
                None => state.rows.remove(&hash),
            };
        }
        if let Some(schema) = self.schema {
            state.schema = schema;
        }
        if let Some(indexes) = self.indexes {
            state.indexes = indexes;
        }
    }
}

fn newest_first<'a>(rows: impl Iterator<Item = &'a MemoryRecord>) -> Vec<&'a MemoryRecord> {
    let mut rows: Vec<&MemoryRecord> = rows.collect();
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.hash.cmp(&b.hash)));
    rows
}

pub struct InMemoryTable {
    name: String,
    path: Option<PathBuf>,
    state: RwLock<TableState>,
    journal: Option<Mutex<Journal>>,
    lex: Mutex<Option<(u64, LexIndex)>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl InMemoryTable {
    /// Table that never touches disk.
    #[must_use]
    pub fn ephemeral(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            state: RwLock::new(TableState::new()),
            journal: None,
            lex: Mutex::new(None),
            embedder: None,
        }
    }

    /// Open (or create) `<dir>/<name>.json` and replay `<dir>/<name>.wal` on top of it.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs_err::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.json"));

        let mut state = if path.exists() {
            let bytes = fs_err::read(&path)?;
            serde_json::from_slice::<TableState>(&bytes)?
        } else {
            TableState::new()
        };

        let journal_path = Journal::path_for(&path);
        let replayed = Journal::recover(&journal_path, state.sequence)?;
        for record in &replayed {
            serde_json::from_str::<TableDelta>(&record.payload)?.apply(&mut state);
            state.sequence = record.sequence;
        }
        let mut journal = Journal::open(journal_path)?;
        journal.note_replayed(replayed.len());

        log::info!(
            "opened table '{}' at {} ({} rows, {} journal records replayed)",
            name,
            path.display(),
            state.rows.len(),
            replayed.len()
        );

        Ok(Self {
            name: name.to_string(),
            path: Some(path),
            state: RwLock::new(state),
            journal: Some(Mutex::new(journal)),
            lex: Mutex::new(None),
            embedder: None,
        })
    }

    /// Fill missing vectors on write using `embedder` when it is available.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Snapshot file for on-disk tables.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the full snapshot atomically, then drop the journal records it now contains.
    fn checkpoint(&self, journal: &mut Journal, state: &TableState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(state)?;
        let mut file = AtomicWriteFile::options().open(path)?;
        file.write_all(&bytes)?;
        file.commit()?;
        journal.reset()?;
        tracing::debug!(
            table = %self.name,
            rows = state.rows.len(),
            sequence = state.sequence,
            "checkpointed table"
        );
        Ok(())
    }

    /// Append the post-image of `undo` to the journal.
    fn log_mutation(&self, state: &mut TableState, undo: &UndoLog) -> Result<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let mut journal = journal.lock()?;
        let sequence = state.sequence + 1;
        let payload = serde_json::to_string(&undo.delta(state))?;
        journal.append(sequence, payload)?;
        state.sequence = sequence;

        if journal.should_checkpoint() {
            // The journal already holds the mutation, so a failed checkpoint loses nothing.
            if let Err(err) = self.checkpoint(&mut *journal, state) {
                tracing::warn!(
                    table = %self.name,
                    error = %err,
                    "checkpoint failed, keeping journal"
                );
            }
        }
        Ok(())
    }

    /// Apply a mutation in place and make it durable, reverting it on any failure.
    fn commit<F>(&self, mutate: F) -> Result<usize>
    where
        F: FnOnce(&mut TableState, &mut UndoLog) -> Result<usize>,
    {
        let mut state = self.state.write()?;
        let mut undo = UndoLog::default();
        let touched = match mutate(&mut *state, &mut undo) {
            Ok(touched) => touched,
            Err(err) => {
                undo.revert(&mut *state);
                return Err(err);
            }
        };
        if undo.is_empty() {
            return Ok(touched);
        }
        if let Err(err) = self.log_mutation(&mut *state, &undo) {
            undo.revert(&mut *state);
            return Err(err);
        }
        state.generation += 1;
        Ok(touched)
    }

    fn embed_missing(&self, rows: &mut [MemoryRecord]) {
        let Some(embedder) = self.embedder.as_deref() else {
            return;
        };
        if !embedder.available() {
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
            embed_all(embedder, &texts)
        };
        match embedded {
            Ok(vectors) => {
                for (idx, vector) in pending.into_iter().zip(vectors) {
                    rows[idx].vector = Some(vector);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, rows = pending.len(), "embed-on-write skipped");
            }
        }
    }

    fn lexical_ranking(&self, state: &TableState, query: &str) -> Result<Ranking> {
        let mut cache = self.lex.lock()?;
        let stale = cache
            .as_ref()
            .is_none_or(|(generation, _)| *generation != state.generation);
        if stale {
            let index = LexIndex::build(
                state
                    .rows
                    .values()
                    .map(|row| (row.hash.as_str(), row.content.as_str())),
            )?;
            *cache = Some((state.generation, index));
        }
        match cache.as_ref() {
            Some((_, index)) => index.search(query),
            None => Ok(Vec::new()),
        }
    }

    /// Cosine ranking of candidates with vectors; `None` when the query cannot be embedded.
    fn semantic_ranking<'a>(
        &self,
        candidates: impl Iterator<Item = &'a MemoryRecord>,
        query: &str,
    ) -> Option<Ranking> {
        let embedder = self.embedder.as_deref()?;
        let query_vector = match embed_all(embedder, &[query]) {
            Ok(mut vectors) => vectors.pop()?,
            Err(err) => {
                tracing::debug!(error = %err, "query embedding unavailable, using lexical ranking");
                return None;
            }
        };

        let mut ranking: Ranking = candidates
            .filter_map(|row| {
                let vector = row.vector.as_deref()?;
                let score = cosine_similarity(&query_vector, vector);
                (score > 0.0).then(|| (row.hash.clone(), score))
            })
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(ranking)
    }
}

impl RecordTable for InMemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Result<TableSchema> {
        Ok(self.state.read()?.schema.clone())
    }

    fn add_columns(&self, columns: &[ColumnSpec]) -> Result<()> {
        self.commit(|state, undo| {
            let schema = undo.schema_mut(state);
            for column in columns {
                if schema.has_column(&column.name) {
                    return Err(MembankError::store(format!(
                        "column '{}' already exists in table '{}'",
                        column.name, self.name
                    )));
                }
                schema.columns.push(ColumnSpec {
                    nullable: true,
                    ..column.clone()
                });
            }
            Ok(columns.len())
        })?;
        Ok(())
    }

    fn merge_insert(&self, mut rows: Vec<MemoryRecord>) -> Result<MergeOutcome> {
        if rows.is_empty() {
            return Ok(MergeOutcome::default());
        }
        self.embed_missing(&mut rows);

        let mut outcome = MergeOutcome::default();
        let batch = rows.len();
        self.commit(|state, undo| {
            for row in &rows {
                if row.id.is_empty() || row.hash.is_empty() {
                    return Err(MembankError::store("row is missing its id or hash"));
                }
                if let Some(column) = row
                    .populated_extended_columns()
                    .into_iter()
                    .find(|column| !state.schema.has_column(column))
                {
                    return Err(MembankError::store(format!(
                        "column '{column}' does not exist in table '{}'",
                        self.name
                    )));
                }
            }

            for mut row in rows {
                match state.rows.get(&row.hash) {
                    Some(existing) => {
                        row.id = existing.id.clone();
                        row.created_at = existing.created_at.min(row.created_at);
                        row.updated_at = row.updated_at.max(existing.updated_at);
                        if row.vector.is_none() && row.content == existing.content {
                            row.vector = existing.vector.clone();
                        }
                        outcome.updated += 1;
                    }
                    None => outcome.inserted += 1,
                }
                row.updated_at = row.updated_at.max(row.created_at);
                undo.put(state, row);
            }
            Ok(batch)
        })?;

        tracing::debug!(
            table = %self.name,
            rows = batch,
            inserted = outcome.inserted,
            updated = outcome.updated,
            "merge insert"
        );
        Ok(outcome)
    }

    fn update_where(&self, predicate: &str, patch: &RecordPatch) -> Result<usize> {
        let predicate = Predicate::parse(predicate)?;
        self.commit(|state, undo| {
            let matching: Vec<MemoryRecord> = state
                .rows
                .values()
                .filter(|row| predicate.matches(row))
                .cloned()
                .collect();
            let touched = matching.len();
            for mut row in matching {
                patch.apply(&mut row);
                undo.put(state, row);
            }
            Ok(touched)
        })
    }

    fn delete_where(&self, predicate: &str) -> Result<usize> {
        let predicate = Predicate::parse(predicate)?;
        self.commit(|state, undo| {
            let matching: Vec<String> = state
                .rows
                .iter()
                .filter(|(_, row)| predicate.matches(row))
                .map(|(hash, _)| hash.clone())
                .collect();
            for hash in &matching {
                undo.remove(state, hash);
            }
            Ok(matching.len())
        })
    }

    fn count_rows(&self, predicate: Option<&str>) -> Result<usize> {
        let predicate = Predicate::parse_optional(predicate)?;
        let state = self.state.read()?;
        Ok(match predicate {
            Some(predicate) => state.rows.values().filter(|row| predicate.matches(row)).count(),
            None => state.rows.len(),
        })
    }

    fn select(&self, predicate: Option<&str>, limit: usize) -> Result<Vec<MemoryRecord>> {
        let predicate = Predicate::parse_optional(predicate)?;
        let state = self.state.read()?;
        let matching = state
            .rows
            .values()
            .filter(|row| predicate.as_ref().is_none_or(|p| p.matches(row)));
        Ok(newest_first(matching)
            .into_iter()
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        Ok(self.state.read()?.indexes.iter().cloned().collect())
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.commit(|state, undo| {
            if !state.schema.has_column(&spec.column) {
                return Err(MembankError::store(format!(
                    "cannot index missing column '{}' in table '{}'",
                    spec.column, self.name
                )));
            }
            undo.indexes_mut(state).insert(spec.clone());
            Ok(1)
        })?;
        log::info!("table '{}': registered index {}", self.name, spec);
        Ok(())
    }

    fn search(&self, request: &TableSearch) -> Result<SearchOutcome> {
        let predicate = Predicate::parse_optional(request.predicate.as_deref())?;
        let state = self.state.read()?;
        let candidates: HashMap<&str, &MemoryRecord> = state
            .rows
            .iter()
            .filter(|(_, row)| predicate.as_ref().is_none_or(|p| p.matches(row)))
            .map(|(hash, row)| (hash.as_str(), row))
            .collect();

        if request.query.trim().is_empty() {
            let hits = newest_first(candidates.values().copied())
                .into_iter()
                .take(request.limit)
                .map(|row| ScoredRecord {
                    record: row.clone(),
                    score: 0.0,
                })
                .collect();
            return Ok(SearchOutcome {
                hits,
                engine: SearchEngineKind::Browse,
            });
        }

        let lexical: Ranking = self
            .lexical_ranking(&state, &request.query)?
            .into_iter()
            .filter(|(hash, _)| candidates.contains_key(hash.as_str()))
            .collect();
        let semantic = self.semantic_ranking(candidates.values().copied(), &request.query);

        let (ranking, engine) = match semantic {
            Some(semantic) if request.rerank => (
                reciprocal_rank_fusion(&[&lexical, &semantic], RRF_K),
                SearchEngineKind::Hybrid,
            ),
            Some(semantic) => (
                weighted_merge(&semantic, &lexical, SEMANTIC_WEIGHT),
                SearchEngineKind::Hybrid,
            ),
            None => (lexical, SearchEngineKind::Lexical),
        };

        let hits: Vec<ScoredRecord> = ranking
            .into_iter()
            .filter_map(|(hash, score)| {
                candidates.get(hash.as_str()).map(|row| ScoredRecord {
                    record: (*row).clone(),
                    score,
                })
            })
            .take(request.limit)
            .collect();
        tracing::debug!(
            table = %self.name,
            candidates = candidates.len(),
            hits = hits.len(),
            ?engine,
            "search"
        );
        Ok(SearchOutcome { hits, engine })
    }

    fn flush(&self) -> Result<()> {
        let state = self.state.read()?;
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let mut journal = journal.lock()?;
        self.checkpoint(&mut journal, &state)
    }
}
