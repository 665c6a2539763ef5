//! Maintenance operations.

use super::lifecycle::Membank;
use crate::error::Result;
use crate::schema::{ensure_extended_schema, ensure_indexes};
use crate::types::{Health, IndexReport, SchemaReport};

impl Membank {
    /// Create any missing index.
    pub fn reindex(&self) -> Result<IndexReport> {
        ensure_indexes(self.table.as_ref())
    }

    /// Re-run schema evolution; a no-op once the extended columns exist.
    pub fn evolve_schema(&self) -> Result<SchemaReport> {
        ensure_extended_schema(self.table.as_ref())
    }

    pub fn health(&self) -> Result<Health> {
        Ok(Health {
            ok: true,
            table: self.table.name().to_string(),
            rows: self.table.count_rows(None)?,
        })
    }
}
