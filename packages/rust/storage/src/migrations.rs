//! SQL migration definitions for the HtmlPage database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: html_pages content store",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- HTML pages managed by the site
CREATE TABLE IF NOT EXISTS html_pages (
    id           INTEGER PRIMARY KEY,
    description  TEXT NOT NULL,
    html_content TEXT NOT NULL,
    enabled      INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_html_pages_enabled ON html_pages(enabled);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Search document index with FTS5",
            sql: r#"
-- Documents produced by indexing passes, keyed by uid
CREATE TABLE IF NOT EXISTS search_documents (
    uid        TEXT PRIMARY KEY,
    url        TEXT NOT NULL,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    doc_type   TEXT NOT NULL,
    site       TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_documents_type ON search_documents(doc_type);

-- Full-text search on documents
CREATE VIRTUAL TABLE IF NOT EXISTS search_documents_fts USING fts5(
    title,
    content,
    content=search_documents,
    content_rowid=rowid
);

-- Triggers to keep FTS in sync with the documents table
CREATE TRIGGER IF NOT EXISTS search_documents_fts_insert AFTER INSERT ON search_documents BEGIN
    INSERT INTO search_documents_fts(rowid, title, content)
    VALUES (new.rowid, new.title, new.content);
END;

CREATE TRIGGER IF NOT EXISTS search_documents_fts_delete AFTER DELETE ON search_documents BEGIN
    INSERT INTO search_documents_fts(search_documents_fts, rowid, title, content)
    VALUES ('delete', old.rowid, old.title, old.content);
END;

CREATE TRIGGER IF NOT EXISTS search_documents_fts_update AFTER UPDATE ON search_documents BEGIN
    INSERT INTO search_documents_fts(search_documents_fts, rowid, title, content)
    VALUES ('delete', old.rowid, old.title, old.content);
    INSERT INTO search_documents_fts(rowid, title, content)
    VALUES (new.rowid, new.title, new.content);
END;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
