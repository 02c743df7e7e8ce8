//! Core domain types: the page record we read and the document we emit.

use serde::{Deserialize, Serialize};

/// Short code suffixed to every uid so ids stay unique across indexers sharing one index.
pub const SHORT_NAME: &str = "hpg";

/// Document type stamped on every emitted document.
pub const DOCUMENT_TYPE: &str = "htmlpage";

/// Resource type tag this indexer owns for incremental update routing.
pub const RESOURCE_TYPE: &str = "HTMLPAGE";

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// One HTML page as held by the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Page identifier.
    pub id: i32,
    /// Page description, used as the document title.
    pub description: String,
    /// Raw HTML body.
    pub html_content: String,
    /// Disabled pages are never indexed.
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// SearchDocument
// ---------------------------------------------------------------------------

/// A flattened, markup-free document ready for the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Link to the page on the portal.
    pub url: String,
    /// `<page id>_hpg`.
    pub uid: String,
    /// Page description, verbatim.
    pub title: String,
    /// Description and body with markup stripped.
    pub content: String,
    /// Always [`DOCUMENT_TYPE`].
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Owning site name.
    pub site: String,
}
