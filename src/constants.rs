//! Shared constants for canonical hashing, batching, and table layout.

/// Field separator for canonical identity strings (ASCII unit separator).
pub const CANONICAL_SEPARATOR: char = '\u{1F}';

/// Joins sorted, lower-cased tags inside a canonical identity string.
pub const TAG_SEPARATOR: &str = "|";

/// Number of digest bytes kept for the canonical hash (128 bits).
pub const HASH_BYTES: usize = 16;

/// Rows per merge-insert batch on the import path.
pub const DEFAULT_IMPORT_CHUNK_SIZE: usize = 1024;

/// Result cap applied when a query does not name one.
pub const DEFAULT_QUERY_LIMIT: usize = 20;

/// Default table name inside the database directory.
pub const DEFAULT_TABLE_NAME: &str = "memory";

/// Dimension of the built-in hashing embedder.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Reciprocal Rank Fusion constant used by the hybrid reranker.
pub const RRF_K: f32 = 60.0;

/// Weight of the semantic score when hybrid results are merged without reranking.
pub const SEMANTIC_WEIGHT: f32 = 0.7;

/// Scalar columns indexed at startup to accelerate filters and upserts.
pub const SCALAR_INDEX_COLUMNS: &[&str] = &[
    "hash",
    "project",
    "repo",
    "kind",
    "scope",
    "pinned",
    "created_at",
];

/// Scalar columns rebuilt after the extended schema adds columns.
pub const EXTENDED_SCALAR_INDEX_COLUMNS: &[&str] = &["external_source", "external_id", "hash"];

/// Journal appends between automatic snapshot checkpoints of an on-disk table.
pub const WAL_CHECKPOINT_PERIOD: u64 = 256;

/// File name of a dated snapshot under `<out_dir>/<YYYY-MM-DD>/`.
pub const SNAPSHOT_FILE_NAME: &str = "memory.jsonl";
