//! Append-only write-ahead journal for on-disk tables.
//!
//! Each committed mutation is appended as one JSON line carrying a sequence number, the
//! payload, and its BLAKE3 checksum. The table snapshot records the last sequence it
//! contains; on open every record after that sequence is replayed. A torn or corrupt line
//! ends recovery, since nothing after it was acknowledged.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::WAL_CHECKPOINT_PERIOD;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct JournalLine {
    sequence: u64,
    checksum: String,
    payload: String,
}

fn checksum(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JournalRecord {
    pub sequence: u64,
    pub payload: String,
}

#[derive(Debug)]
pub(crate) struct Journal {
    path: PathBuf,
    file: fs_err::File,
    appends_since_checkpoint: u64,
}

impl Journal {
    /// Journal file kept next to a table snapshot.
    pub(crate) fn path_for(snapshot: &Path) -> PathBuf {
        snapshot.with_extension("wal")
    }

    pub(crate) fn open(path: PathBuf) -> Result<Self> {
        let file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            appends_since_checkpoint: 0,
        })
    }

    /// Valid records with a sequence greater than `after`, in append order.
    pub(crate) fn recover(path: &Path, after: u64) -> Result<Vec<JournalRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs_err::File::open(path)?);
        let mut records = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<JournalLine>(&line)
                .ok()
                .filter(|entry| entry.checksum == checksum(&entry.payload));
            let Some(entry) = parsed else {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    "journal tail is torn, ignoring the remaining records"
                );
                break;
            };
            if entry.sequence > after {
                records.push(JournalRecord {
                    sequence: entry.sequence,
                    payload: entry.payload,
                });
            }
        }
        Ok(records)
    }

    /// Append one record and sync it to disk before returning.
    pub(crate) fn append(&mut self, sequence: u64, payload: String) -> Result<()> {
        let line = JournalLine {
            sequence,
            checksum: checksum(&payload),
            payload,
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        self.file.write_all(&bytes)?;
        self.file.sync_data()?;
        self.appends_since_checkpoint = self.appends_since_checkpoint.saturating_add(1);
        Ok(())
    }

    /// Count records replayed at open so they also trigger a checkpoint.
    pub(crate) fn note_replayed(&mut self, count: usize) {
        self.appends_since_checkpoint = self.appends_since_checkpoint.saturating_add(count as u64);
    }

    pub(crate) fn should_checkpoint(&self) -> bool {
        self.appends_since_checkpoint >= WAL_CHECKPOINT_PERIOD
    }

    /// Drop every record once a snapshot containing them has been committed.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        self.appends_since_checkpoint = 0;
        tracing::debug!(path = %self.path.display(), "journal checkpointed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal_in(dir: &tempfile::TempDir) -> (PathBuf, Journal) {
        let path = dir.path().join("t.wal");
        let journal = Journal::open(path.clone()).unwrap();
        (path, journal)
    }

    #[test]
    fn append_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut journal) = journal_in(&dir);
        journal.append(1, "first".into()).unwrap();
        journal.append(2, "second".into()).unwrap();
        journal.append(3, "third".into()).unwrap();

        let records = Journal::recover(&path, 1).unwrap();
        let sequences: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
        assert_eq!(records[1].payload, "third");
    }

    #[test]
    fn torn_tail_stops_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut journal) = journal_in(&dir);
        journal.append(1, "kept".into()).unwrap();
        drop(journal);

        let mut file = fs_err::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"sequence\":2,\"checksum\":\"00\",\"payload\":\"bad\"}\n{\"seq")
            .unwrap();

        let records = Journal::recover(&path, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, "kept");
    }

    #[test]
    fn reset_empties_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut journal) = journal_in(&dir);
        journal.append(1, "x".into()).unwrap();
        journal.reset().unwrap();
        assert!(Journal::recover(&path, 0).unwrap().is_empty());
        assert!(!journal.should_checkpoint());

        journal.append(2, "y".into()).unwrap();
        assert_eq!(Journal::recover(&path, 0).unwrap().len(), 1);
    }

    #[test]
    fn missing_journal_recovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Journal::recover(&dir.path().join("none.wal"), 0).unwrap().is_empty());
    }
}
