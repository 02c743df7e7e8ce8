//! In-memory test doubles for the store and sink seams.

use async_trait::async_trait;

use htmlpage_shared::{ContentRecord, IndexerError, Result, SearchDocument};

use crate::sink::{IndexSink, MemorySink};
use crate::source::ContentStore;

pub(crate) fn record(id: i32, description: &str, html: &str, enabled: bool) -> ContentRecord {
    ContentRecord {
        id,
        description: description.into(),
        html_content: html.into(),
        enabled,
    }
}

/// Content store over a fixed list of records.
pub(crate) struct MemoryStore {
    records: Vec<ContentRecord>,
    available: bool,
}

impl MemoryStore {
    pub(crate) fn new(records: Vec<ContentRecord>) -> Self {
        Self {
            records,
            available: true,
        }
    }

    /// A store whose every call fails.
    pub(crate) fn unavailable() -> Self {
        Self {
            records: Vec::new(),
            available: false,
        }
    }

    fn check(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(IndexerError::Storage("store unavailable".into()))
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<ContentRecord>> {
        self.check()?;
        Ok(self.records.iter().filter(|r| r.enabled).cloned().collect())
    }

    async fn get_enabled(&self, id: i32) -> Result<Option<ContentRecord>> {
        self.check()?;
        Ok(self
            .records
            .iter()
            .find(|r| r.id == id && r.enabled)
            .cloned())
    }
}

/// Sink that rejects one uid and accepts everything else.
pub(crate) struct FailingSink {
    reject_uid: String,
    accepted: MemorySink,
}

impl FailingSink {
    pub(crate) fn rejecting(uid: &str) -> Self {
        Self {
            reject_uid: uid.into(),
            accepted: MemorySink::new(),
        }
    }
}

#[async_trait]
impl IndexSink for FailingSink {
    async fn write(&self, doc: &SearchDocument) -> Result<()> {
        if doc.uid == self.reject_uid {
            return Err(IndexerError::Sink(format!("index refused {}", doc.uid)));
        }
        self.accepted.write(doc).await
    }
}
