//! Public types exposed by the `membank-core` crate.

pub mod item;
pub mod options;
pub mod record;
pub mod schema;
pub mod search;

pub use item::{AddMemoryResponse, ImportItem, NewMemory, RawItem};
pub use options::{
    DeleteReport, Health, ImportReport, ImportSpec, IndexReport, PinReport, SchemaReport,
    UpsertReport,
};
pub use record::{MemoryRecord, RecordPatch};
pub use schema::{ColumnSpec, ColumnType, IndexKind, IndexSpec, TableSchema, extended_columns};
pub use search::{QueryHit, QueryRequest, QueryResponse, SearchEngineKind};
