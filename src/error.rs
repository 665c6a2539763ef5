//! Error taxonomy for the memory record store.
//!
//! Bad input (unknown import source, malformed filter, invalid raw item) is always raised
//! before any write reaches the table. Store failures are opaque and never retried here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MembankError>;

#[derive(Debug, Error)]
pub enum MembankError {
    #[error("unknown import source '{name}'")]
    UnknownSource { name: String },

    #[error("invalid filter value for '{key}': {reason}")]
    InvalidFilter { key: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("store unavailable / write failed: {reason}")]
    Store { reason: String },

    #[error("embedding engine unavailable: {reason}")]
    EmbeddingUnavailable { reason: String },

    #[error("malformed predicate: {reason}")]
    Predicate { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "lex")]
    #[error("full-text index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

impl MembankError {
    pub(crate) fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_filter(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for bad-input errors, which are raised before any write is attempted.
    #[must_use]
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownSource { .. } | Self::InvalidFilter { .. } | Self::InvalidInput { .. }
        )
    }

    /// True for errors the caller should treat as "store unavailable / write failed".
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        match self {
            Self::Store { .. } | Self::Io(_) | Self::Json(_) => true,
            #[cfg(feature = "lex")]
            Self::Tantivy(_) => true,
            _ => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for MembankError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::store("table lock poisoned")
    }
}
