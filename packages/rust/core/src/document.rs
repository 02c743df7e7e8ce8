//! Page record → search document transformation.

use std::fmt::Display;

use tracing::debug;
use url::Url;

use htmlpage_shared::{
    AppConfig, ContentRecord, DOCUMENT_TYPE, IndexerError, Result, SHORT_NAME, SearchDocument,
};

/// Query parameter selecting the portal application that renders the page.
pub const PARAM_XPAGE_APP: &str = "page";

/// Query parameter carrying the page id.
pub const PARAMETER_HTMLPAGE_ID: &str = "htmlpage_id";

/// Compute the index-wide unique id of a page: `<id>_hpg`.
pub fn compute_uid(id: impl Display) -> String {
    format!("{id}_{SHORT_NAME}")
}

/// Text submitted to the stripper: description, one space, raw body.
pub fn content_to_index(record: &ContentRecord) -> String {
    let mut content =
        String::with_capacity(record.description.len() + 1 + record.html_content.len());
    content.push_str(&record.description);
    content.push(' ');
    content.push_str(&record.html_content);
    content
}

/// Builds [`SearchDocument`]s for one portal and site.
///
/// Holds only the parsed base URL and the site name, so building is a pure
/// function of the record.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    base_url: Url,
    site: String,
}

impl DocumentBuilder {
    /// Create a builder for pages served under `base_url`.
    pub fn new(base_url: &str, site: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| IndexerError::config(format!("invalid portal URL '{base_url}': {e}")))?;
        Ok(Self {
            base_url,
            site: site.into(),
        })
    }

    /// Create a builder from the `[site]` section of the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.site.portal_url, config.site.name.clone())
    }

    /// Link to a page on the portal.
    pub fn page_url(&self, id: i32) -> String {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(PARAM_XPAGE_APP, DOCUMENT_TYPE)
            .append_pair(PARAMETER_HTMLPAGE_ID, &id.to_string());
        url.into()
    }

    /// Build the search document for `record`.
    ///
    /// Fails with [`IndexerError::Build`] when the page markup cannot be parsed.
    pub fn build(&self, record: &ContentRecord) -> Result<SearchDocument> {
        let content = htmlpage_markup::strip(&content_to_index(record))
            .map_err(|e| IndexerError::build(record.id, e))?;

        debug!(id = record.id, content_len = content.len(), "document built");

        Ok(SearchDocument {
            url: self.page_url(record.id),
            uid: compute_uid(record.id),
            title: record.description.clone(),
            content,
            doc_type: DOCUMENT_TYPE.to_string(),
            site: self.site.clone(),
        })
    }
}
