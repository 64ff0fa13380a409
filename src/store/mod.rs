// src/store/mod.rs
// =============================================================================
// Persistence of crawled pages and their child links.
//
// The crawl engine only needs the narrow contract in `Store`; SqliteStore is
// the implementation the CLI uses.
//
// "Page not stored" is an expected answer from lookup_page (Ok(None)), not
// an error. Writes aimed at a page that does not exist fail with
// StoreError::PageNotFound.
// =============================================================================

mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{LinkMap, PageRecord, SearchHit};

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("page not found in store: {0}")]
    PageNotFound(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid timestamp in store: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store {
    /// The stored page with all its children, or None if it was never stored
    fn lookup_page(&self, url: &str) -> StoreResult<Option<PageRecord>>;

    fn insert_page(&self, url: &str, status: u16, last_crawled_at: DateTime<Utc>) -> StoreResult<()>;

    /// Stores `children` under an existing page
    fn insert_children(&self, url: &str, children: &LinkMap) -> StoreResult<()>;

    fn update_last_crawled(&self, url: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Returns the candidates that are not yet stored for `url`
    fn prune_known_children(&self, url: &str, candidates: LinkMap) -> StoreResult<LinkMap>;

    /// Child links whose anchor text contains `term` (case-sensitive)
    fn search_by_text(&self, term: &str) -> StoreResult<Vec<SearchHit>>;
}
