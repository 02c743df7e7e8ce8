//! Document building and indexing orchestration for HTML pages.
//!
//! This crate ties the content store, the markup stripper and the index sinks
//! together into the two indexer entry points: a full pass and a single-page
//! fetch for incremental updates.

pub mod document;
pub mod indexer;
pub mod registry;
pub mod sink;
pub mod source;

#[cfg(test)]
mod testing;

pub use document::{DocumentBuilder, compute_uid};
pub use indexer::{
    HtmlPageIndexer, IndexFailure, IndexProgress, IndexReport, Indexer, SilentProgress,
};
pub use registry::IndexerRegistry;
pub use sink::{IndexSink, JsonLinesSink, MemorySink};
pub use source::ContentStore;
