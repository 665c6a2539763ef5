//! Storage and hybrid-search engine.
//!
//! The record store talks to storage only through [`RecordTable`]. [`InMemoryTable`] is the
//! bundled implementation: an in-process table persisted as a JSON snapshot plus a
//! write-ahead journal, with a Tantivy full-text index and cosine ranking over vectors.

pub mod fulltext;
pub mod hybrid;
mod journal;
mod memory;
pub mod predicate;
mod table;

pub use memory::InMemoryTable;
pub use predicate::Predicate;
pub use table::{MergeOutcome, RecordTable, ScoredRecord, SearchOutcome, TableSearch};
