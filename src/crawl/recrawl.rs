// src/crawl/recrawl.rs
// =============================================================================
// Decides whether a stored page is crawled again, and what gets saved.
//
// - should_recrawl: a page is stale once it is older than the threshold
// - prune_known_children: drops (text, url) pairs that are already stored
// - refresh: the whole "lookup, maybe crawl, persist" flow
//
// refresh has three outcomes:
// 1. Not stored yet: crawl, insert the page row, insert its children.
// 2. Stored and stale: crawl, update the timestamp of the existing row, and
//    insert only the children that are not stored yet. The page row itself
//    is never inserted again.
// 3. Stored and fresh: no network traffic, the stored record is returned.
//
// Pruning only removes exact (text, url) matches. A known text pointing at a
// new url is kept and stored as an additional row. Rows that vanished from
// the page stay in the store.
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::error::CrawlResult;
use crate::models::{LinkMap, PageRecord};
use crate::store::Store;
use crate::validate::validate_url;

use super::depth::Crawler;

/// True when `last_crawled_at` is more than `threshold` before `now`
pub fn should_recrawl(last_crawled_at: DateTime<Utc>, threshold: Duration, now: DateTime<Utc>) -> bool {
    now - last_crawled_at > threshold
}

/// Removes every candidate that matches a stored (text, url) pair exactly
///
/// `stored` may hold the same text more than once (one row per link it
/// pointed at over time); each pair is checked on its own.
pub fn prune_known_children<'a, I>(mut candidates: LinkMap, stored: I) -> LinkMap
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (text, url) in stored {
        if candidates.get(text) == Some(url) {
            candidates.remove(text);
        }
    }
    candidates
}

/// What `refresh` did
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Stored and still fresh; nothing was fetched
    Fresh(PageRecord),
    /// First crawl of this URL
    Crawled(PageRecord),
    /// Stale page crawled again; `new_children` is what got stored
    Recrawled {
        record: PageRecord,
        new_children: LinkMap,
    },
}

impl RefreshOutcome {
    pub fn record(&self) -> &PageRecord {
        match self {
            RefreshOutcome::Fresh(record)
            | RefreshOutcome::Crawled(record)
            | RefreshOutcome::Recrawled { record, .. } => record,
        }
    }

    pub fn was_fetched(&self) -> bool {
        !matches!(self, RefreshOutcome::Fresh(_))
    }
}

/// Looks up `seed`, crawls it when missing or stale, and persists the result
///
/// The store is written only after the crawl has finished, so a failed crawl
/// leaves it untouched.
pub async fn refresh<S: Store>(
    store: &S,
    crawler: &Crawler,
    seed: &str,
    depth: usize,
    threshold: Duration,
    now: DateTime<Utc>,
) -> CrawlResult<RefreshOutcome> {
    // Stored rows are keyed by the normalised URL
    let seed: Url = validate_url(seed)?;

    match store.lookup_page(seed.as_str())? {
        None => {
            log::info!("{} is not stored yet", seed);
            let record = crawler.crawl(seed.as_str(), depth).await?;

            store.insert_page(&record.url, record.status, record.last_crawled_at)?;
            if !record.links.is_empty() {
                store.insert_children(&record.url, &record.links)?;
            }

            Ok(RefreshOutcome::Crawled(record))
        }
        Some(stored) if should_recrawl(stored.last_crawled_at, threshold, now) => {
            log::info!(
                "{} was crawled at {}, crawling again",
                stored.url,
                stored.last_crawled_at.to_rfc3339()
            );
            let record = crawler.crawl(seed.as_str(), depth).await?;

            store.update_last_crawled(&stored.url, record.last_crawled_at)?;
            let new_children = store.prune_known_children(&stored.url, record.links.clone())?;
            log::info!(
                "{} of {} link(s) were already stored",
                record.links.len() - new_children.len(),
                record.links.len()
            );
            if !new_children.is_empty() {
                store.insert_children(&stored.url, &new_children)?;
            }

            Ok(RefreshOutcome::Recrawled {
                record,
                new_children,
            })
        }
        Some(stored) => {
            log::info!("{} is fresh, using the stored copy", stored.url);
            Ok(RefreshOutcome::Fresh(stored))
        }
    }
}
