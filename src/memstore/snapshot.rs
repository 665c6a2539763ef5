//! Dated JSON-lines export of every stored record.

use std::io::Write;
use std::path::{Path, PathBuf};

use atomic_write_file::AtomicWriteFile;
use chrono::Utc;
use tracing::instrument;

use super::lifecycle::Membank;
use crate::constants::SNAPSHOT_FILE_NAME;
use crate::error::Result;

impl Membank {
    /// Write every record, vectors included, to `<out_dir>/<YYYY-MM-DD>/memory.jsonl`.
    ///
    /// Lines are in the shape the `jsonl` import source reads, so a snapshot re-imports with
    /// its ids and hashes intact. The file is replaced atomically; a snapshot taken twice on
    /// the same day overwrites the earlier one.
    #[instrument(skip(self, out_dir), fields(out_dir = %out_dir.as_ref().display()))]
    pub fn snapshot(&self, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let day_dir = out_dir
            .as_ref()
            .join(Utc::now().format("%Y-%m-%d").to_string());
        fs_err::create_dir_all(&day_dir)?;
        let path = day_dir.join(SNAPSHOT_FILE_NAME);

        let rows = self.table.select(None, usize::MAX)?;
        let mut bytes = Vec::new();
        for row in &rows {
            serde_json::to_writer(&mut bytes, row)?;
            bytes.push(b'\n');
        }

        let mut file = AtomicWriteFile::options().open(&path)?;
        file.write_all(&bytes)?;
        file.commit()?;

        log::info!(
            "snapshot of table '{}' written to {} ({} rows)",
            self.table.name(),
            path.display(),
            rows.len()
        );
        Ok(path)
    }
}
