//! Bulk import: source adapters and the chunked upsert pipeline.

pub mod adapters;
mod pipeline;

pub use adapters::{ImportSource, JsonlAdapter, MarkdownAdapter, SlackAdapter, SourceAdapter};
