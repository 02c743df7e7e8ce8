//! Shared types, error model, and configuration for the HtmlPage indexer.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`IndexerError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`SearchDocument`]) and identity constants
//! - Configuration ([`AppConfig`], [`SharedConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, IndexerConfig, SharedConfig, SiteConfig, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{IndexerError, Result};
pub use types::{ContentRecord, DOCUMENT_TYPE, RESOURCE_TYPE, SHORT_NAME, SearchDocument};
