//! The indexer capability interface and the HtmlPage indexing driver.
//!
//! A host holds indexers as `Arc<dyn Indexer>`, checks [`Indexer::is_enabled`]
//! before running a full pass, and routes single-resource updates by
//! [`Indexer::resource_type_tags`].

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use htmlpage_shared::{IndexerError, RESOURCE_TYPE, Result, SearchDocument, SharedConfig};

use crate::document::{self, DocumentBuilder};
use crate::sink::IndexSink;
use crate::source::ContentStore;

/// Resource type tags owned by the HtmlPage indexer. Frozen at first use.
static RESOURCE_TYPE_TAGS: LazyLock<BTreeSet<&'static str>> =
    LazyLock::new(|| BTreeSet::from([RESOURCE_TYPE]));

// ---------------------------------------------------------------------------
// Capability interface
// ---------------------------------------------------------------------------

/// What a host needs from an indexer.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> String;

    /// Human-readable description.
    fn description(&self) -> String;

    /// Version string.
    fn version(&self) -> String;

    /// Whether the host should run this indexer.
    fn is_enabled(&self) -> bool;

    /// Index the whole corpus into `sink`, one document at a time.
    ///
    /// Per-record failures are logged and reported, never fatal.
    async fn index_all(&self, sink: &dyn IndexSink) -> Result<IndexReport>;

    /// Build the document for one resource, `None` if it is missing or disabled.
    async fn fetch_one(&self, id: i32) -> Result<Option<SearchDocument>>;

    /// Resource type tags this indexer owns.
    fn resource_type_tags(&self) -> &BTreeSet<&'static str>;

    /// Uid of the document for a resource, without building it.
    fn compute_uid(&self, resource_id: &str, resource_type: &str) -> String;
}

// ---------------------------------------------------------------------------
// Report & progress
// ---------------------------------------------------------------------------

/// A record that could not be indexed during a full pass.
#[derive(Debug)]
pub struct IndexFailure {
    /// Page id.
    pub record_id: i32,
    /// Why it failed.
    pub error: IndexerError,
}

/// Outcome of a full indexing pass.
#[derive(Debug)]
pub struct IndexReport {
    /// Identifies the pass in logs.
    pub run_id: Uuid,
    /// Enabled records found in the store.
    pub total: usize,
    /// Documents written to the sink.
    pub indexed: usize,
    /// Records skipped because building or writing failed.
    pub failures: Vec<IndexFailure>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl IndexReport {
    /// Whether every enabled record reached the sink.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress callback for reporting pass status.
pub trait IndexProgress: Send + Sync {
    /// Called once the enabled records have been listed.
    fn started(&self, total: usize);
    /// Called after each record, whether it succeeded or not.
    fn record_processed(&self, record_id: i32, current: usize, total: usize);
    /// Called when the pass completes.
    fn finished(&self, report: &IndexReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl IndexProgress for SilentProgress {
    fn started(&self, _total: usize) {}
    fn record_processed(&self, _record_id: i32, _current: usize, _total: usize) {}
    fn finished(&self, _report: &IndexReport) {}
}

// ---------------------------------------------------------------------------
// HtmlPage indexer
// ---------------------------------------------------------------------------

/// Indexes enabled HTML pages from a [`ContentStore`].
///
/// Holds no state between calls: configuration is read from the shared
/// handle on every call and the builder is rebuilt for each operation.
pub struct HtmlPageIndexer<S> {
    store: S,
    config: SharedConfig,
    progress: Arc<dyn IndexProgress>,
}

impl<S: ContentStore> HtmlPageIndexer<S> {
    pub fn new(store: S, config: SharedConfig) -> Self {
        Self {
            store,
            config,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Report pass progress to `progress` instead of discarding it.
    pub fn with_progress(mut self, progress: Arc<dyn IndexProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// The underlying content store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn builder(&self) -> Result<DocumentBuilder> {
        DocumentBuilder::from_config(&self.config.snapshot())
    }
}

#[async_trait]
impl<S: ContentStore + 'static> Indexer for HtmlPageIndexer<S> {
    fn name(&self) -> String {
        self.config.snapshot().indexer.name
    }

    fn description(&self) -> String {
        self.config.snapshot().indexer.description
    }

    fn version(&self) -> String {
        self.config.snapshot().indexer.version
    }

    fn is_enabled(&self) -> bool {
        self.config.snapshot().indexer.enable
    }

    #[instrument(skip_all)]
    async fn index_all(&self, sink: &dyn IndexSink) -> Result<IndexReport> {
        let start = Instant::now();
        let run_id = Uuid::now_v7();
        let builder = self.builder()?;

        let records: Vec<_> = self
            .store
            .list_enabled()
            .await?
            .into_iter()
            .filter(|record| record.enabled)
            .collect();
        let total = records.len();

        info!(%run_id, total, "starting indexing pass");
        self.progress.started(total);

        let mut indexed = 0;
        let mut failures = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let written = match builder.build(record) {
                Ok(doc) => {
                    let outcome = sink.write(&doc).await;
                    outcome.map(|()| doc)
                }
                Err(e) => Err(e),
            };

            match written {
                Ok(doc) => {
                    info!(
                        doc_type = %doc.doc_type,
                        uid = %doc.uid,
                        title = %doc.title,
                        "indexing"
                    );
                    indexed += 1;
                }
                Err(e) => {
                    if matches!(e, IndexerError::Build { .. }) {
                        warn!(record_id = record.id, error = %e, "skipping page");
                    } else {
                        error!(record_id = record.id, error = %e, "failed to write document");
                    }
                    failures.push(IndexFailure {
                        record_id: record.id,
                        error: e,
                    });
                }
            }

            self.progress.record_processed(record.id, i + 1, total);
        }

        let report = IndexReport {
            run_id,
            total,
            indexed,
            failures,
            elapsed: start.elapsed(),
        };

        info!(
            %run_id,
            indexed = report.indexed,
            failed = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "indexing pass complete"
        );
        self.progress.finished(&report);

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, id: i32) -> Result<Option<SearchDocument>> {
        let record = match self.store.get_enabled(id).await? {
            Some(record) if record.enabled => record,
            _ => {
                debug!("page missing or disabled");
                return Ok(None);
            }
        };

        let doc = self.builder()?.build(&record)?;
        info!(uid = %doc.uid, title = %doc.title, "page document built");
        Ok(Some(doc))
    }

    fn resource_type_tags(&self) -> &BTreeSet<&'static str> {
        &RESOURCE_TYPE_TAGS
    }

    fn compute_uid(&self, resource_id: &str, _resource_type: &str) -> String {
        document::compute_uid(resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use htmlpage_shared::{AppConfig, ContentRecord};
    use htmlpage_storage::Storage;

    use crate::sink::MemorySink;
    use crate::testing::{FailingSink, MemoryStore, record};

    fn config(enable: bool) -> SharedConfig {
        let mut config = AppConfig::default();
        config.indexer.enable = enable;
        config.site.name = "TestSite".into();
        config.site.portal_url = "http://portal.test/jsp/site/Portal.jsp".into();
        SharedConfig::new(config)
    }

    fn indexer(records: Vec<ContentRecord>) -> HtmlPageIndexer<MemoryStore> {
        HtmlPageIndexer::new(MemoryStore::new(records), config(true))
    }

    #[tokio::test]
    async fn index_all_writes_only_enabled_records() {
        let records = vec![
            record(1, "One", "<p>one</p>", true),
            record(2, "Two", "<p>two</p>", false),
            record(3, "Three", "<p>three</p>", true),
            record(4, "Four", "<p>four</p>", false),
            record(5, "Five", "<p>five</p>", true),
        ];
        let sink = MemorySink::new();

        let report = indexer(records).index_all(&sink).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.indexed, 3);
        assert!(report.is_complete());
        let uids: Vec<String> = sink.documents().into_iter().map(|d| d.uid).collect();
        assert_eq!(uids, ["1_hpg", "3_hpg", "5_hpg"]);
    }

    #[tokio::test]
    async fn index_all_skips_broken_records_and_continues() {
        let records = vec![
            record(1, "Good", "<p>fine</p>", true),
            record(2, "Broken", "<p>fine</p><!-- never closed", true),
            record(3, "Also good", "<p>fine too</p>", true),
        ];
        let sink = MemorySink::new();

        let report = indexer(records).index_all(&sink).await.unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record_id, 2);
        assert!(matches!(
            report.failures[0].error,
            IndexerError::Build { record_id: 2, .. }
        ));
        assert_eq!(sink.documents().len(), 2);
    }

    #[tokio::test]
    async fn index_all_records_sink_failures() {
        let records = vec![
            record(1, "One", "a", true),
            record(2, "Two", "b", true),
            record(3, "Three", "c", true),
        ];
        let sink = FailingSink::rejecting("2_hpg");

        let report = indexer(records).index_all(&sink).await.unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, IndexerError::Sink(_)));
    }

    #[tokio::test]
    async fn index_all_fails_when_store_cannot_list() {
        let idx = HtmlPageIndexer::new(MemoryStore::unavailable(), config(true));
        let err = idx.index_all(&MemorySink::new()).await.unwrap_err();
        assert!(matches!(err, IndexerError::Storage(_)));
    }

    #[tokio::test]
    async fn index_all_on_empty_store() {
        let sink = MemorySink::new();
        let report = indexer(vec![]).index_all(&sink).await.unwrap();
        assert_eq!(report.indexed, 0);
        assert!(sink.documents().is_empty());
    }

    #[tokio::test]
    async fn index_all_over_libsql_indexes_enabled_pages_only() {
        let db = std::env::temp_dir().join(format!("hpi_indexer_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&db).await.unwrap();
        for (description, enabled) in [
            ("Accueil", true),
            ("Brouillon", false),
            ("Horaires", true),
            ("Archive", false),
            ("Contact", true),
        ] {
            storage
                .insert_page(description, "<p>Mairie &agrave; Paris</p>", enabled)
                .await
                .unwrap();
        }

        let idx = HtmlPageIndexer::new(storage, config(true));
        let report = idx.index_all(idx.store()).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.indexed, 3);
        assert_eq!(idx.store().count_documents().await.unwrap(), 3);
        assert!(idx.store().get_document("2_hpg").await.unwrap().is_none());
        let doc = idx.store().get_document("3_hpg").await.unwrap().expect("indexed");
        assert_eq!(doc.content, "Horaires Mairie à Paris");
        let _ = std::fs::remove_file(&db);
    }

    #[tokio::test]
    async fn fetch_one_returns_none_for_missing_or_disabled() {
        let idx = indexer(vec![record(1, "Off", "<p>x</p>", false)]);
        assert!(idx.fetch_one(1).await.unwrap().is_none());
        assert!(idx.fetch_one(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_one_uid_matches_compute_uid() {
        let idx = indexer(vec![record(7, "Help", "<p>Call us</p>", true)]);
        let doc = idx.fetch_one(7).await.unwrap().expect("enabled page");

        assert_eq!(doc.uid, idx.compute_uid("7", RESOURCE_TYPE));
        assert_eq!(doc.content, "Help Call us");
        assert_eq!(doc.site, "TestSite");
        assert_eq!(
            doc.url,
            "http://portal.test/jsp/site/Portal.jsp?page=htmlpage&htmlpage_id=7"
        );
    }

    #[tokio::test]
    async fn fetch_one_propagates_build_errors() {
        let idx = indexer(vec![record(8, "Broken", "<div", true)]);
        let err = idx.fetch_one(8).await.unwrap_err();
        assert!(matches!(err, IndexerError::Build { record_id: 8, .. }));
    }

    #[tokio::test]
    async fn metadata_is_read_at_call_time() {
        let shared = config(false);
        let idx = HtmlPageIndexer::new(MemoryStore::new(vec![]), shared.clone());
        assert!(!idx.is_enabled());
        assert_eq!(idx.name(), "HtmlPage Indexer");

        let mut updated = shared.snapshot();
        updated.indexer.enable = true;
        updated.indexer.name = "Pages".into();
        updated.indexer.version = "3.1".into();
        shared.replace(updated);

        assert!(idx.is_enabled());
        assert_eq!(idx.name(), "Pages");
        assert_eq!(idx.version(), "3.1");
    }

    #[tokio::test]
    async fn invalid_portal_url_fails_the_pass() {
        let shared = config(true);
        let mut broken = shared.snapshot();
        broken.site.portal_url = "::".into();
        shared.replace(broken);

        let idx = HtmlPageIndexer::new(MemoryStore::new(vec![record(1, "a", "b", true)]), shared);
        let err = idx.index_all(&MemorySink::new()).await.unwrap_err();
        assert!(matches!(err, IndexerError::Config { .. }));
    }

    #[test]
    fn owns_a_single_resource_tag() {
        let idx = indexer(vec![]);
        let tags: Vec<&str> = idx.resource_type_tags().iter().copied().collect();
        assert_eq!(tags, [RESOURCE_TYPE]);
        assert_eq!(idx.compute_uid("12", "anything"), "12_hpg");
    }

    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl IndexProgress for RecordingProgress {
        fn started(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn record_processed(&self, record_id: i32, current: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{record_id} {current}/{total}"));
        }
        fn finished(&self, report: &IndexReport) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {}", report.indexed));
        }
    }

    #[tokio::test]
    async fn progress_sees_every_record() {
        let progress = Arc::new(RecordingProgress {
            events: Mutex::new(Vec::new()),
        });
        let idx = indexer(vec![
            record(4, "a", "<p>x</p>", true),
            record(9, "b", "<p", true),
        ])
        .with_progress(progress.clone());

        idx.index_all(&MemorySink::new()).await.unwrap();

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(events, ["start 2", "4 1/2", "9 2/2", "done 1"]);
    }
}
