//! Content store seam: where enabled pages come from.

use async_trait::async_trait;

use htmlpage_shared::{ContentRecord, Result};
use htmlpage_storage::Storage;

/// Read access to the pages an indexer may publish.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every enabled page.
    async fn list_enabled(&self) -> Result<Vec<ContentRecord>>;

    /// One page by id, `None` if it does not exist or is disabled.
    async fn get_enabled(&self, id: i32) -> Result<Option<ContentRecord>>;
}

#[async_trait]
impl ContentStore for Storage {
    async fn list_enabled(&self) -> Result<Vec<ContentRecord>> {
        self.list_enabled_pages().await
    }

    async fn get_enabled(&self, id: i32) -> Result<Option<ContentRecord>> {
        self.get_enabled_page(id).await
    }
}
