//! Store configuration.
//!
//! Defaults suit an ephemeral in-process table. [`MembankConfig::from_env`] overlays the
//! `GM_*` environment variables on those defaults.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_IMPORT_CHUNK_SIZE, DEFAULT_QUERY_LIMIT, DEFAULT_TABLE_NAME,
};
use crate::embed::{DisabledEmbedder, Embedder, HashingEmbedder};
use crate::error::{MembankError, Result};

pub const ENV_DB_PATH: &str = "GM_DB";
pub const ENV_TABLE: &str = "GM_TABLE";
pub const ENV_IMPORT_CHUNK: &str = "GM_IMPORT_CHUNK";
pub const ENV_QUERY_LIMIT: &str = "GM_QUERY_LIMIT";
pub const ENV_EMBED_ENABLED: &str = "GM_EMBED_ENABLED";
pub const ENV_EMBED_DIM: &str = "GM_EMBED_DIM";

fn default_true() -> bool {
    true
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_table() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_import_chunk_size() -> usize {
    DEFAULT_IMPORT_CHUNK_SIZE
}

fn default_query_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    /// The built-in embedder this configuration describes.
    #[must_use]
    pub fn build(&self) -> Arc<dyn Embedder> {
        if self.enabled && self.dimension > 0 {
            Arc::new(HashingEmbedder::new(self.dimension))
        } else {
            Arc::new(DisabledEmbedder)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembankConfig {
    /// Directory holding `<table>.json`. `None` keeps the table in memory only.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_table")]
    pub table: String,
    /// Rows per merge-insert batch on the import path.
    #[serde(default = "default_import_chunk_size")]
    pub import_chunk_size: usize,
    /// Applied when a query asks for `limit == 0`.
    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for MembankConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            table: default_table(),
            import_chunk_size: DEFAULT_IMPORT_CHUNK_SIZE,
            default_query_limit: DEFAULT_QUERY_LIMIT,
            embedding: EmbeddingConfig::default(),
        }
    }
}

fn parse_number(key: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| MembankError::InvalidInput {
        reason: format!("{key} must be a non-negative integer, got '{raw}'"),
    })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MembankError::InvalidInput {
            reason: format!("{key} must be a boolean, got '{raw}'"),
        }),
    }
}

impl MembankConfig {
    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[must_use]
    pub fn import_chunk_size(mut self, size: usize) -> Self {
        self.import_chunk_size = size;
        self
    }

    #[must_use]
    pub fn default_query_limit(mut self, limit: usize) -> Self {
        self.default_query_limit = limit;
        self
    }

    #[must_use]
    pub fn embedding_enabled(mut self, enabled: bool) -> Self {
        self.embedding.enabled = enabled;
        self
    }

    #[must_use]
    pub fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding.dimension = dimension;
        self
    }

    /// Defaults overlaid with the `GM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; unset or empty values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(table) = get(ENV_TABLE) {
            config.table = table;
        }
        if let Some(raw) = get(ENV_IMPORT_CHUNK) {
            config.import_chunk_size = parse_number(ENV_IMPORT_CHUNK, &raw)?;
        }
        if let Some(raw) = get(ENV_QUERY_LIMIT) {
            config.default_query_limit = parse_number(ENV_QUERY_LIMIT, &raw)?;
        }
        if let Some(raw) = get(ENV_EMBED_ENABLED) {
            config.embedding.enabled = parse_flag(ENV_EMBED_ENABLED, &raw)?;
        }
        if let Some(raw) = get(ENV_EMBED_DIM) {
            config.embedding.dimension = parse_number(ENV_EMBED_DIM, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.import_chunk_size == 0 {
            return Err(MembankError::InvalidInput {
                reason: "import_chunk_size must be at least 1".to_string(),
            });
        }
        if self.default_query_limit == 0 {
            return Err(MembankError::InvalidInput {
                reason: "default_query_limit must be at least 1".to_string(),
            });
        }
        if self.table.trim().is_empty() {
            return Err(MembankError::InvalidInput {
                reason: "table name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
