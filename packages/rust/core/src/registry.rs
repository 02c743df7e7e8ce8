//! Host-side registry routing resource types to the indexer that owns them.

use std::sync::Arc;

use htmlpage_shared::{IndexerError, Result};

use crate::indexer::Indexer;

/// The indexers a host knows about.
#[derive(Default)]
pub struct IndexerRegistry {
    indexers: Vec<Arc<dyn Indexer>>,
}

impl IndexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indexer. Each resource type tag may be owned by one indexer only.
    pub fn register(&mut self, indexer: Arc<dyn Indexer>) -> Result<()> {
        for tag in indexer.resource_type_tags() {
            if let Some(owner) = self.for_resource_type(tag) {
                return Err(IndexerError::validation(format!(
                    "resource type '{tag}' is already owned by '{}'",
                    owner.name()
                )));
            }
        }
        tracing::debug!(name = %indexer.name(), "indexer registered");
        self.indexers.push(indexer);
        Ok(())
    }

    /// The indexer owning `resource_type`, if any.
    pub fn for_resource_type(&self, resource_type: &str) -> Option<Arc<dyn Indexer>> {
        self.indexers
            .iter()
            .find(|i| i.resource_type_tags().contains(resource_type))
            .cloned()
    }

    /// Uid a resource would be indexed under, if some indexer owns its type.
    pub fn compute_uid(&self, resource_id: &str, resource_type: &str) -> Option<String> {
        self.for_resource_type(resource_type)
            .map(|i| i.compute_uid(resource_id, resource_type))
    }

    /// Registered indexers whose enable switch is on.
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn Indexer>> {
        self.indexers.iter().filter(|i| i.is_enabled())
    }

    /// All registered indexers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Indexer>> {
        self.indexers.iter()
    }
}
