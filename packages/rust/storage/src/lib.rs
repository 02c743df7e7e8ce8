//! libSQL storage for HTML pages and the search document index.
//!
//! The [`Storage`] struct wraps one local libSQL database holding two things:
//! - `html_pages`, the content store pages are read from
//! - `search_documents`, the index indexing passes write into (with FTS5)
//!
//! **Access rules:**
//! - Indexing and page management: read-write via [`Storage::open`]
//! - Search front-ends: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use htmlpage_shared::{ContentRecord, IndexerError, Result, SearchDocument};
use libsql::{Connection, Database, params};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn db_err(e: impl std::fmt::Display) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexerError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    IndexerError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(IndexerError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Page operations
    // -----------------------------------------------------------------------

    /// Insert a new page. Returns the generated page id.
    pub async fn insert_page(
        &self,
        description: &str,
        html_content: &str,
        enabled: bool,
    ) -> Result<i32> {
        self.check_writable()?;
        if description.trim().is_empty() {
            return Err(IndexerError::validation("page description must not be empty"));
        }
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO html_pages (description, html_content, enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    description,
                    html_content,
                    i64::from(enabled),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;

        let id = self.conn.last_insert_rowid();
        i32::try_from(id).map_err(|_| IndexerError::Storage(format!("page id {id} out of range")))
    }

    /// Replace a page's description, body and enabled flag.
    /// Returns `false` if no page has that id.
    pub async fn update_page(&self, page: &ContentRecord) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE html_pages
                 SET description = ?1, html_content = ?2, enabled = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    page.description.as_str(),
                    page.html_content.as_str(),
                    i64::from(page.enabled),
                    now.as_str(),
                    i64::from(page.id)
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Enable or disable a page. Returns `false` if no page has that id.
    pub async fn set_page_enabled(&self, id: i32, enabled: bool) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE html_pages SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
                params![i64::from(enabled), now.as_str(), i64::from(id)],
            )
            .await
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Get a page by id, enabled or not.
    pub async fn get_page(&self, id: i32) -> Result<Option<ContentRecord>> {
        self.query_one_page(
            "SELECT id, description, html_content, enabled FROM html_pages WHERE id = ?1",
            id,
        )
        .await
    }

    /// Get a page by id, only if it is enabled.
    pub async fn get_enabled_page(&self, id: i32) -> Result<Option<ContentRecord>> {
        self.query_one_page(
            "SELECT id, description, html_content, enabled FROM html_pages
             WHERE id = ?1 AND enabled = 1",
            id,
        )
        .await
    }

    /// List every page, ordered by id.
    pub async fn list_pages(&self) -> Result<Vec<ContentRecord>> {
        self.query_pages(
            "SELECT id, description, html_content, enabled FROM html_pages ORDER BY id",
        )
        .await
    }

    /// List enabled pages, ordered by id.
    pub async fn list_enabled_pages(&self) -> Result<Vec<ContentRecord>> {
        self.query_pages(
            "SELECT id, description, html_content, enabled FROM html_pages
             WHERE enabled = 1 ORDER BY id",
        )
        .await
    }

    /// Delete a page. Returns `false` if no page has that id.
    pub async fn delete_page(&self, id: i32) -> Result<bool> {
        self.check_writable()?;
        let changed = self
            .conn
            .execute("DELETE FROM html_pages WHERE id = ?1", params![i64::from(id)])
            .await
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn query_one_page(&self, sql: &str, id: i32) -> Result<Option<ContentRecord>> {
        let mut rows = self
            .conn
            .query(sql, params![i64::from(id)])
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn query_pages(&self, sql: &str) -> Result<Vec<ContentRecord>> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Document index operations
    // -----------------------------------------------------------------------

    /// Insert or replace a document, keyed by uid.
    pub async fn upsert_document(&self, doc: &SearchDocument) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO search_documents (uid, url, title, content, doc_type, site, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(uid) DO UPDATE SET
                   url = excluded.url,
                   title = excluded.title,
                   content = excluded.content,
                   doc_type = excluded.doc_type,
                   site = excluded.site,
                   indexed_at = excluded.indexed_at",
                params![
                    doc.uid.as_str(),
                    doc.url.as_str(),
                    doc.title.as_str(),
                    doc.content.as_str(),
                    doc.doc_type.as_str(),
                    doc.site.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Get an indexed document by uid.
    pub async fn get_document(&self, uid: &str) -> Result<Option<SearchDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT uid, url, title, content, doc_type, site
                 FROM search_documents WHERE uid = ?1",
                params![uid],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(SearchDocument {
                uid: row.get::<String>(0).map_err(db_err)?,
                url: row.get::<String>(1).map_err(db_err)?,
                title: row.get::<String>(2).map_err(db_err)?,
                content: row.get::<String>(3).map_err(db_err)?,
                doc_type: row.get::<String>(4).map_err(db_err)?,
                site: row.get::<String>(5).map_err(db_err)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Number of documents in the index.
    pub async fn count_documents(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM search_documents", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => {
                let count = row.get::<i64>(0).map_err(db_err)?;
                Ok(u64::try_from(count).unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // FTS search
    // -----------------------------------------------------------------------

    /// Full-text search over indexed document titles and content.
    pub async fn search_documents(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let mut rows = self
            .conn
            .query(
                "SELECT d.uid, d.title, d.url, rank
                 FROM search_documents_fts fts
                 JOIN search_documents d ON d.rowid = fts.rowid
                 WHERE search_documents_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                params![query, limit],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(SearchHit {
                uid: row.get::<String>(0).map_err(db_err)?,
                title: row.get::<String>(1).map_err(db_err)?,
                url: row.get::<String>(2).map_err(db_err)?,
                score: row.get::<f64>(3).unwrap_or(0.0),
            });
        }
        Ok(results)
    }
}

/// A search result from FTS5.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Document uid.
    pub uid: String,
    /// Document title.
    pub title: String,
    /// Document URL.
    pub url: String,
    /// FTS5 rank score (lower is better).
    pub score: f64,
}

/// Convert a `html_pages` row to a [`ContentRecord`].
fn row_to_record(row: &libsql::Row) -> Result<ContentRecord> {
    let id = row.get::<i64>(0).map_err(db_err)?;
    Ok(ContentRecord {
        id: i32::try_from(id)
            .map_err(|_| IndexerError::Storage(format!("page id {id} out of range")))?,
        description: row.get::<String>(1).map_err(db_err)?,
        html_content: row.get::<String>(2).map_err(db_err)?,
        enabled: row.get::<i64>(3).map_err(db_err)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("hpi_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn document(uid: &str, title: &str, content: &str) -> SearchDocument {
        SearchDocument {
            url: format!("http://localhost/Portal.jsp?page=htmlpage&htmlpage_id={uid}"),
            uid: uid.into(),
            title: title.into(),
            content: content.into(),
            doc_type: "htmlpage".into(),
            site: "Lutece".into(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("hpi_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn page_crud() {
        let storage = test_storage().await;

        let id = storage
            .insert_page("Help", "<p>Call us</p>", true)
            .await
            .expect("insert page");

        let page = storage.get_page(id).await.expect("get page").expect("exists");
        assert_eq!(page.description, "Help");
        assert_eq!(page.html_content, "<p>Call us</p>");
        assert!(page.enabled);

        let updated = ContentRecord {
            html_content: "<p>Write to us</p>".into(),
            ..page
        };
        assert!(storage.update_page(&updated).await.expect("update"));
        let page = storage.get_page(id).await.unwrap().unwrap();
        assert_eq!(page.html_content, "<p>Write to us</p>");

        assert!(storage.delete_page(id).await.expect("delete"));
        assert!(storage.get_page(id).await.unwrap().is_none());
        assert!(!storage.delete_page(id).await.unwrap());
    }

    #[tokio::test]
    async fn insert_rejects_empty_description() {
        let storage = test_storage().await;
        let err = storage.insert_page("  ", "<p>x</p>", true).await.unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[tokio::test]
    async fn enabled_filtering() {
        let storage = test_storage().await;
        let on = storage.insert_page("On", "a", true).await.unwrap();
        let off = storage.insert_page("Off", "b", false).await.unwrap();

        let enabled = storage.list_enabled_pages().await.expect("list enabled");
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, on);
        assert_eq!(storage.list_pages().await.unwrap().len(), 2);

        assert!(storage.get_enabled_page(off).await.unwrap().is_none());
        assert!(storage.get_enabled_page(on).await.unwrap().is_some());

        assert!(storage.set_page_enabled(off, true).await.unwrap());
        assert!(storage.get_enabled_page(off).await.unwrap().is_some());
        assert!(!storage.set_page_enabled(9999, true).await.unwrap());
    }

    #[tokio::test]
    async fn document_upsert_replaces_by_uid() {
        let storage = test_storage().await;

        storage
            .upsert_document(&document("7_hpg", "Help", "Help Call us"))
            .await
            .expect("upsert");
        storage
            .upsert_document(&document("7_hpg", "Help", "Help Write to us"))
            .await
            .expect("upsert again");

        assert_eq!(storage.count_documents().await.unwrap(), 1);
        let doc = storage.get_document("7_hpg").await.unwrap().unwrap();
        assert_eq!(doc.content, "Help Write to us");
        assert!(storage.get_document("8_hpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fts_search() {
        let storage = test_storage().await;

        for (uid, title, content) in [
            ("1_hpg", "Opening hours", "Opening hours Monday to Friday"),
            ("2_hpg", "Contact", "Contact Call the front desk"),
            ("3_hpg", "Parking", "Parking Underground parking access"),
        ] {
            storage
                .upsert_document(&document(uid, title, content))
                .await
                .unwrap();
        }

        let results = storage.search_documents("parking", 10).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uid, "3_hpg");
    }

    #[tokio::test]
    async fn malformed_fts_query_is_an_error() {
        let storage = test_storage().await;
        storage
            .upsert_document(&document("3_hpg", "Parking", "Parking Underground parking access"))
            .await
            .unwrap();

        for query in ["parking AND (", "\"parking"] {
            let err = storage.search_documents(query, 10).await.unwrap_err();
            assert!(matches!(err, IndexerError::Storage(_)), "{query}: {err}");
        }
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("hpi_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_page("Home", "<p>hi</p>", true).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_pages().await.unwrap().len(), 1);

        let result = ro.insert_page("Other", "<p>x</p>", true).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));

        let result = ro.upsert_document(&document("1_hpg", "Home", "Home hi")).await;
        assert!(result.is_err());
    }
}
