//! Construction, boot, and shutdown of the [`Membank`] handle.

use std::sync::Arc;

use crate::config::MembankConfig;
use crate::embed::Embedder;
use crate::engine::{InMemoryTable, RecordTable};
use crate::error::Result;
use crate::schema::{ensure_extended_schema, ensure_indexes};

/// Handle to one memory record table.
///
/// Construct it once with [`Membank::open`] (or [`Membank::with_table`] for a custom engine)
/// and share it; every operation takes `&self`.
pub struct Membank {
    pub(crate) table: Arc<dyn RecordTable>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) config: MembankConfig,
}

impl std::fmt::Debug for Membank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Membank")
            .field("table", &self.table.name())
            .field("embedder", &self.embedder.model())
            .field("config", &self.config)
            .finish()
    }
}

impl Membank {
    /// Open the table described by `config`, then evolve its schema and ensure indexes.
    pub fn open(config: MembankConfig) -> Result<Self> {
        config.validate()?;
        let embedder = config.embedding.build();
        let table = match &config.db_path {
            Some(dir) => InMemoryTable::open(dir, &config.table)?,
            None => InMemoryTable::ephemeral(config.table.clone()),
        }
        .with_embedder(Arc::clone(&embedder));
        Self::with_table(Arc::new(table), embedder, config)
    }

    /// Wrap an existing engine. Runs the same boot sequence as [`Membank::open`].
    pub fn with_table(
        table: Arc<dyn RecordTable>,
        embedder: Arc<dyn Embedder>,
        config: MembankConfig,
    ) -> Result<Self> {
        config.validate()?;
        let schema = ensure_extended_schema(table.as_ref())?;
        let indexes = ensure_indexes(table.as_ref())?;
        log::info!(
            "membank ready: table '{}' ({} columns added, {} indexes created, embedder {})",
            table.name(),
            schema.added.len(),
            indexes.created.len(),
            embedder.model()
        );
        Ok(Self {
            table,
            embedder,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MembankConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self) -> &dyn RecordTable {
        self.table.as_ref()
    }

    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Flush the table and release the handle.
    pub fn close(self) -> Result<()> {
        self.table.flush()?;
        log::info!("membank closed: table '{}'", self.table.name());
        Ok(())
    }
}
