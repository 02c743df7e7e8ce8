//! Index sinks: where built documents are written.
//!
//! Each document is written on its own as soon as it is built; sinks never
//! see a batch and provide no atomicity across documents.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use htmlpage_shared::{IndexerError, Result, SearchDocument};
use htmlpage_storage::Storage;

/// Destination for search documents.
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Write (insert or replace by uid) one document.
    async fn write(&self, doc: &SearchDocument) -> Result<()>;
}

#[async_trait]
impl IndexSink for Storage {
    async fn write(&self, doc: &SearchDocument) -> Result<()> {
        self.upsert_document(doc).await
    }
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

/// Appends one JSON object per document to a file, flushing after each line,
/// ready to be posted to a search engine's bulk update endpoint.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| IndexerError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| IndexerError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IndexSink for JsonLinesSink {
    async fn write(&self, doc: &SearchDocument) -> Result<()> {
        let line = serde_json::to_string(doc).map_err(|e| IndexerError::Sink(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| IndexerError::Sink("JSON lines writer lock poisoned".into()))?;
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| IndexerError::io(&self.path, e))
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Collects documents in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<SearchDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents written so far.
    pub fn documents(&self) -> Vec<SearchDocument> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IndexSink for MemorySink {
    async fn write(&self, doc: &SearchDocument) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| IndexerError::Sink("memory sink lock poisoned".into()))?
            .push(doc.clone());
        Ok(())
    }
}
