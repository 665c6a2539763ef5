//! Schema evolution and index maintenance.
//!
//! Both routines are additive and idempotent: they never drop or rename a column, and a
//! second run against an up-to-date table changes nothing.

use tracing::instrument;

use crate::constants::{EXTENDED_SCALAR_INDEX_COLUMNS, SCALAR_INDEX_COLUMNS};
use crate::engine::RecordTable;
use crate::error::Result;
use crate::types::{IndexReport, IndexSpec, SchemaReport, extended_columns};

/// Indexes every table is expected to carry.
#[must_use]
pub fn required_indexes() -> Vec<IndexSpec> {
    let mut specs = vec![IndexSpec::vector("vector"), IndexSpec::full_text("content")];
    specs.extend(SCALAR_INDEX_COLUMNS.iter().map(|column| IndexSpec::scalar(column)));
    specs
}

/// Add any missing extended columns, then rebuild the indexes that depend on them.
#[instrument(skip(table), fields(table = table.name()))]
pub fn ensure_extended_schema(table: &dyn RecordTable) -> Result<SchemaReport> {
    let schema = table.schema()?;
    let missing: Vec<_> = extended_columns()
        .into_iter()
        .filter(|column| !schema.has_column(&column.name))
        .collect();

    if missing.is_empty() {
        tracing::debug!("extended schema already present");
        return Ok(SchemaReport::default());
    }

    let added: Vec<String> = missing.iter().map(|column| column.name.clone()).collect();
    table.add_columns(&missing)?;
    log::info!(
        "table '{}': added extended columns {}",
        table.name(),
        added.join(", ")
    );

    // New columns invalidate the provenance lookups and the content index.
    let mut reindexed = IndexReport::default();
    let rebuild = EXTENDED_SCALAR_INDEX_COLUMNS
        .iter()
        .map(|column| IndexSpec::scalar(column))
        .chain(std::iter::once(IndexSpec::full_text("content")));
    for spec in rebuild {
        table.create_index(&spec)?;
        reindexed.created.push(spec);
    }

    Ok(SchemaReport { added, reindexed })
}

/// Create each required index that does not exist yet.
#[instrument(skip(table), fields(table = table.name()))]
pub fn ensure_indexes(table: &dyn RecordTable) -> Result<IndexReport> {
    let present = table.list_indexes()?;
    let mut report = IndexReport::default();

    for spec in required_indexes() {
        if present.contains(&spec) {
            report.existing.push(spec);
            continue;
        }
        table.create_index(&spec)?;
        report.created.push(spec);
    }

    if !report.created.is_empty() {
        let created: Vec<String> = report.created.iter().map(ToString::to_string).collect();
        log::info!("table '{}': created indexes {}", table.name(), created.join(", "));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryTable;
    use crate::types::{ColumnSpec, ColumnType};

    #[test]
    fn extended_schema_is_added_once() {
        let table = InMemoryTable::ephemeral("t");
        let first = ensure_extended_schema(&table).unwrap();
        assert_eq!(
            first.added,
            vec![
                "external_source",
                "external_id",
                "external_url",
                "author",
                "created_at_orig",
                "metadata"
            ]
        );
        assert_eq!(first.reindexed.created.len(), 4);
        assert!(first.reindexed.created.contains(&IndexSpec::full_text("content")));

        let second = ensure_extended_schema(&table).unwrap();
        assert!(second.added.is_empty());
        assert!(second.reindexed.is_noop());
    }

    #[test]
    fn partially_evolved_table_only_gains_missing_columns() {
        let table = InMemoryTable::ephemeral("t");
        table
            .add_columns(&[ColumnSpec::nullable("author", ColumnType::Utf8)])
            .unwrap();
        let report = ensure_extended_schema(&table).unwrap();
        assert_eq!(report.added.len(), 5);
        assert!(!report.added.contains(&"author".to_string()));

        let schema = table.schema().unwrap();
        let base = crate::types::TableSchema::base();
        for column in base.column_names() {
            assert!(schema.has_column(column));
        }
    }

    #[test]
    fn ensure_indexes_is_idempotent() {
        let table = InMemoryTable::ephemeral("t");
        let first = ensure_indexes(&table).unwrap();
        assert_eq!(first.created, required_indexes());
        assert!(first.existing.is_empty());

        let second = ensure_indexes(&table).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.existing.len(), required_indexes().len());
    }

    #[test]
    fn ensure_indexes_fills_gaps_only() {
        let table = InMemoryTable::ephemeral("t");
        table.create_index(&IndexSpec::scalar("hash")).unwrap();
        let report = ensure_indexes(&table).unwrap();
        assert_eq!(report.existing, vec![IndexSpec::scalar("hash")]);
        assert_eq!(report.created.len(), required_indexes().len() - 1);
    }
}
