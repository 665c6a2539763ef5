#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation,
        clippy::float_cmp,
        clippy::cast_precision_loss
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions - these are allowed project-wide for pragmatic reasons:
//
// Documentation lints: Many internal/self-documenting functions don't need extensive docs.
// Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: casts are bounded by row counts and embedding dimensions.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
// Style/complexity
#![allow(clippy::too_many_lines)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::similar_names)]
// e.g., created_at, updated_at, created_at_orig are intentionally similar
//
// Pattern matching: These pedantic lints often suggest changes that reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
//
// Performance/ergonomics trade-offs that are acceptable for this codebase:
#![allow(clippy::needless_pass_by_value)] // Many builders take owned values intentionally
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't need must_use on every method
#![allow(clippy::format_push_string)]
//
// Low-value pedantic lints that add noise:
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::should_implement_trait)]
//
// Return value wrapping: the table trait returns Result everywhere so engines can fail.
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::unused_self)]

//! Content-addressable memory record store.
//!
//! Items are canonicalized into a stable 128-bit identity, merged into a record table by
//! that identity, queried through a validated filter compiler plus hybrid lexical/semantic
//! ranking, and bulk-loaded from external sources in chunks.

/// The membank-core crate version (matches `Cargo.toml`).
pub const MEMBANK_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod canonical;
pub mod config;
pub mod constants;
pub mod embed;
pub mod engine;
pub mod error;
pub mod filter;
pub mod import;
pub mod memstore;
pub mod schema;
pub mod types;

#[cfg(test)]
mod tests_lex_flag;

pub use canonical::{Canonical, canonicalize, canonicalize_import, digest_hex};
pub use config::{EmbeddingConfig, MembankConfig};
pub use constants::*;
pub use embed::{DisabledEmbedder, Embedder, HashingEmbedder};
pub use engine::{
    InMemoryTable, MergeOutcome, RecordTable, ScoredRecord, SearchOutcome, TableSearch,
};
pub use error::{MembankError, Result};
pub use filter::{MemoryFilter, compile_filters};
pub use import::{ImportSource, SourceAdapter};
pub use memstore::Membank;
pub use schema::{ensure_extended_schema, ensure_indexes};
pub use types::{
    AddMemoryResponse, ColumnSpec, ColumnType, DeleteReport, Health, ImportItem, ImportReport,
    ImportSpec, IndexKind, IndexReport, IndexSpec, MemoryRecord, NewMemory, PinReport,
    QueryHit, QueryRequest, QueryResponse, RawItem, RecordPatch, SchemaReport, SearchEngineKind,
    TableSchema, UpsertReport,
};
