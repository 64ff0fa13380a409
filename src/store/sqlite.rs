// src/store/sqlite.rs
// =============================================================================
// SQLite implementation of the page store.
//
// Schema:
//   pages(id, url UNIQUE, status, last_crawled)
//   child_links(id, page_id -> pages.id ON DELETE CASCADE, anchor_text, url)
//
// Timestamps are stored as RFC 3339 text. A page may own several rows with
// the same anchor text when its link changed between crawls; lookups return
// the newest one for each text.
// =============================================================================

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::crawl::prune_known_children;
use crate::models::{LinkMap, PageRecord, SearchHit};

use super::{Store, StoreError, StoreResult};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS pages (
        id INTEGER NOT NULL PRIMARY KEY,
        url TEXT NOT NULL UNIQUE,
        status INTEGER NOT NULL,
        last_crawled TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS child_links (
        id INTEGER NOT NULL PRIMARY KEY,
        page_id INTEGER NOT NULL,
        anchor_text TEXT NOT NULL,
        url TEXT NOT NULL,
        FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS child_links_page ON child_links(page_id);
"#;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file and makes sure the tables exist
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of stored pages
    pub fn page_count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of child rows stored under `url`
    pub fn child_count(&self, url: &str) -> StoreResult<usize> {
        let page_id = self.require_page_id(url)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM child_links WHERE page_id = ?1",
            params![page_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn page_id(&self, url: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM pages WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn require_page_id(&self, url: &str) -> StoreResult<i64> {
        self.page_id(url)?
            .ok_or_else(|| StoreError::PageNotFound(url.to_string()))
    }

    // All (text, url) rows of a page, oldest first
    fn child_rows(&self, page_id: i64) -> StoreResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT anchor_text, url FROM child_links WHERE page_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![page_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Store for SqliteStore {
    fn lookup_page(&self, url: &str) -> StoreResult<Option<PageRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, status, last_crawled FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((page_id, status, last_crawled)) = row else {
            return Ok(None);
        };

        let last_crawled_at = parse_timestamp(&last_crawled)?;
        let mut record = PageRecord::new(url, status, last_crawled_at);
        record.links = self.child_rows(page_id)?.into_iter().collect();

        Ok(Some(record))
    }

    fn insert_page(&self, url: &str, status: u16, last_crawled_at: DateTime<Utc>) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, status, last_crawled) VALUES (?1, ?2, ?3)",
            params![url, status, last_crawled_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn insert_children(&self, url: &str, children: &LinkMap) -> StoreResult<()> {
        let page_id = self.require_page_id(url)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO child_links (page_id, anchor_text, url) VALUES (?1, ?2, ?3)",
            )?;
            for (text, link) in children {
                stmt.execute(params![page_id, text, link])?;
            }
        }
        tx.commit()?;

        log::debug!("stored {} child link(s) for {}", children.len(), url);
        Ok(())
    }

    fn update_last_crawled(&self, url: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE pages SET last_crawled = ?1 WHERE url = ?2",
            params![at.to_rfc3339(), url],
        )?;
        if updated == 0 {
            return Err(StoreError::PageNotFound(url.to_string()));
        }
        Ok(())
    }

    fn prune_known_children(&self, url: &str, candidates: LinkMap) -> StoreResult<LinkMap> {
        let page_id = self.require_page_id(url)?;
        let stored = self.child_rows(page_id)?;
        Ok(prune_known_children(
            candidates,
            stored.iter().map(|(text, link)| (text, link)),
        ))
    }

    fn search_by_text(&self, term: &str) -> StoreResult<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT anchor_text, url FROM child_links
             WHERE instr(anchor_text, ?1) > 0
             ORDER BY url, anchor_text",
        )?;
        let hits = stmt
            .query_map(params![term], |row| {
                Ok(SearchHit {
                    text: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
