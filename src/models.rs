// src/models.rs
// =============================================================================
// Data that flows through a crawl.
//
// - LinkMap: anchor text -> absolute URL. Text keys are unique, so inserting
//   an existing text overwrites its URL (last write wins).
// - PageRecord: the seed page plus every link discovered while expanding it.
// - FetchResult: what one fetch of one URL produced. It is moved through the
//   result channel to the aggregator and consumed there exactly once.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CrawlError;

/// Anchor text -> absolute URL
///
/// A BTreeMap keeps printing and JSON output in a stable order.
pub type LinkMap = BTreeMap<String, String>;

/// Merges `incoming` into `target`, overwriting entries with the same text
pub fn merge_links(target: &mut LinkMap, incoming: LinkMap) {
    target.extend(incoming);
}

/// A crawled page as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// Validated, normalised absolute URL of the seed
    pub url: String,
    /// HTTP status of the seed fetch
    pub status: u16,
    /// Links discovered on the seed and on every expanded level
    pub links: LinkMap,
    pub last_crawled_at: DateTime<Utc>,
}

impl PageRecord {
    pub fn new(url: impl Into<String>, status: u16, last_crawled_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            status,
            links: LinkMap::new(),
            last_crawled_at,
        }
    }
}

impl fmt::Display for PageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \t {} \t {} \t {}",
            self.url,
            self.status,
            self.links.len(),
            self.last_crawled_at.to_rfc3339()
        )
    }
}

/// Outcome of fetching a single URL
#[derive(Debug)]
pub struct FetchResult {
    /// The URL as handed to the fetcher, or its normalised form once validated
    pub source_url: String,
    /// None when no HTTP response was received
    pub status: Option<u16>,
    pub links: LinkMap,
    pub error: Option<CrawlError>,
}

impl FetchResult {
    /// A page that answered; non-2xx answers carry an empty link map
    pub fn page(source_url: impl Into<String>, status: u16, links: LinkMap) -> Self {
        Self {
            source_url: source_url.into(),
            status: Some(status),
            links,
            error: None,
        }
    }

    pub fn failed(source_url: impl Into<String>, error: CrawlError) -> Self {
        Self {
            source_url: source_url.into(),
            status: None,
            links: LinkMap::new(),
            error: Some(error),
        }
    }
}

/// A child link row as returned by a text search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub url: String,
}
