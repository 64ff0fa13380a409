// src/crawl/depth.rs
// =============================================================================
// Breadth-first expansion of a seed page, one depth level at a time.
//
// How it works:
// 1. Fetch the seed on its own. If that fails the whole crawl fails, there
//    is nothing to expand.
// 2. Repeat `depth` times: every link value gathered so far becomes the next
//    frontier, the frontier is fetched as one batch by the worker pool, and
//    the batch's links are merged into the record (same text -> last wins).
// 3. Return the record.
//
// The frontier is built from *all* links gathered so far, not only the new
// ones, and nothing remembers which URLs were already fetched. A URL listed
// under two anchor texts is fetched twice, and earlier levels are fetched
// again at every deeper level. Levels can grow with the branching factor,
// so depth is the only brake on the number of requests. Setting
// `unique_frontier` switches to a per-crawl visited set instead.
//
// A batch that hits its deadline keeps its partial links and the crawl moves
// on to the next level. A batch cancelled by the caller aborts the crawl so
// that nothing half-built gets persisted.
// =============================================================================

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{CrawlError, CrawlResult};
use crate::models::{merge_links, LinkMap, PageRecord};

use super::fetch::PageFetcher;
use super::pool::{crawl_batch, DEFAULT_BATCH_TIMEOUT};

/// Knobs for one crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    /// Concurrent workers per batch
    pub pool_size: usize,
    /// Deadline for each batch
    pub batch_timeout: Duration,
    /// Fetch each URL at most once per crawl
    pub unique_frontier: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            pool_size: crate::config::default_pool_size(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            unique_frontier: false,
        }
    }
}

/// What happened at one expansion level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    /// 1 for the seed's children, 2 for the next level, ...
    pub depth: usize,
    /// URLs handed to the worker pool
    pub frontier: usize,
    pub fetched: usize,
    pub failed: usize,
    pub timed_out: bool,
}

/// A finished crawl and its per-level statistics
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub record: PageRecord,
    pub levels: Vec<LevelReport>,
}

impl CrawlReport {
    /// Fetches made, the seed included
    pub fn pages_fetched(&self) -> usize {
        1 + self.levels.iter().map(|level| level.fetched).sum::<usize>()
    }

    pub fn failures(&self) -> usize {
        self.levels.iter().map(|level| level.failed).sum()
    }
}

pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    options: CrawlOptions,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to stop the crawl from outside (e.g. on Ctrl-C)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Crawls `seed` and expands it `depth` levels deep
    pub async fn crawl(&self, seed: &str, depth: usize) -> CrawlResult<PageRecord> {
        Ok(self.crawl_with_report(seed, depth).await?.record)
    }

    /// Like `crawl`, also reporting what each level did
    pub async fn crawl_with_report(&self, seed: &str, depth: usize) -> CrawlResult<CrawlReport> {
        log::info!("crawling {} with depth {}", seed, depth);

        let seed_result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CrawlError::BatchCanceled),
            result = self.fetcher.fetch(seed) => result,
        };

        if let Some(error) = seed_result.error {
            return Err(error);
        }

        let mut record = PageRecord::new(
            seed_result.source_url,
            seed_result.status.unwrap_or_default(),
            Utc::now(),
        );
        record.links = seed_result.links;

        let mut visited = HashSet::new();
        visited.insert(record.url.clone());

        let mut levels = Vec::new();

        for level in 1..=depth {
            let frontier = self.next_frontier(&record.links, &mut visited);
            if frontier.is_empty() {
                log::info!("nothing left to crawl at depth {}", level);
                break;
            }

            log::info!("crawling depth {}: {} url(s)", level, frontier.len());
            let frontier_size = frontier.len();

            let outcome = crawl_batch(
                Arc::clone(&self.fetcher),
                frontier,
                self.options.pool_size,
                self.options.batch_timeout,
                &self.cancel,
            )
            .await;

            for failure in &outcome.failures {
                log::warn!("failed to crawl {}: {}", failure.url, failure.error);
            }

            let report = LevelReport {
                depth: level,
                frontier: frontier_size,
                fetched: outcome.fetched,
                failed: outcome.failures.len(),
                timed_out: matches!(outcome.interrupted, Some(CrawlError::BatchTimeout(_))),
            };
            log::info!(
                "depth {}: {} of {} url(s) fetched, {} failed{}",
                report.depth,
                report.fetched,
                report.frontier,
                report.failed,
                if report.timed_out { ", timed out" } else { "" }
            );
            levels.push(report);

            merge_links(&mut record.links, outcome.links);

            match outcome.interrupted {
                Some(CrawlError::BatchCanceled) => return Err(CrawlError::BatchCanceled),
                Some(reason) => log::warn!("depth {} is incomplete: {}", level, reason),
                None => {}
            }
        }

        let report = CrawlReport { record, levels };
        log::info!(
            "crawl of {} finished: {} page(s) fetched, {} failure(s), {} link(s)",
            report.record.url,
            report.pages_fetched(),
            report.failures(),
            report.record.links.len()
        );

        Ok(report)
    }

    fn next_frontier(&self, links: &LinkMap, visited: &mut HashSet<String>) -> Vec<String> {
        if self.options.unique_frontier {
            links
                .values()
                .filter(|url| visited.insert(url.to_string()))
                .cloned()
                .collect()
        } else {
            links.values().cloned().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::testing::ScriptedFetcher;

    const SEED: &str = "https://example.com/";

    fn options() -> CrawlOptions {
        CrawlOptions {
            pool_size: 2,
            batch_timeout: Duration::from_secs(5),
            unique_frontier: false,
        }
    }

    // seed -> a, b; a -> c; b -> d
    fn small_site() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .page(
                SEED,
                &[("A", "https://example.com/a"), ("B", "https://example.com/b")],
            )
            .page("https://example.com/a", &[("C", "https://example.com/c")])
            .page("https://example.com/b", &[("D", "https://example.com/d")])
            .page("https://example.com/c", &[])
            .page("https://example.com/d", &[])
    }

    #[tokio::test]
    async fn test_depth_zero_only_fetches_the_seed() {
        let fetcher = Arc::new(small_site());
        let report = Crawler::new(fetcher.clone(), options())
            .crawl_with_report(SEED, 0)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), vec![SEED.to_string()]);
        assert!(report.levels.is_empty());
        assert_eq!(report.record.url, SEED);
        assert_eq!(report.record.status, 200);
        assert_eq!(report.record.links.len(), 2);
        assert_eq!(report.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_depth_one_runs_one_batch_of_the_children() {
        let fetcher = Arc::new(small_site());
        let report = Crawler::new(fetcher.clone(), options())
            .crawl_with_report(SEED, 1)
            .await
            .unwrap();

        assert_eq!(report.levels.len(), 1);
        assert_eq!(report.levels[0].frontier, 2);
        assert_eq!(report.levels[0].fetched, 2);
        assert_eq!(fetcher.calls().len(), 3);

        let links = &report.record.links;
        assert_eq!(links.len(), 4);
        assert_eq!(links["C"], "https://example.com/c");
        assert_eq!(links["D"], "https://example.com/d");
    }

    #[tokio::test]
    async fn test_depth_two_expands_from_merged_links() {
        let fetcher = Arc::new(small_site());
        let report = Crawler::new(fetcher.clone(), options())
            .crawl_with_report(SEED, 2)
            .await
            .unwrap();

        assert_eq!(report.levels.len(), 2);
        assert_eq!(report.levels[0].frontier, 2);
        // Every link known after level one: a, b, c, d
        assert_eq!(report.levels[1].frontier, 4);
        assert_eq!(fetcher.calls().len(), 1 + 2 + 4);
        assert_eq!(report.pages_fetched(), 7);
    }

    #[tokio::test]
    async fn test_same_url_under_two_texts_is_fetched_twice() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(
                    SEED,
                    &[("Docs", "https://example.com/docs"), ("Manual", "https://example.com/docs")],
                )
                .page("https://example.com/docs", &[]),
        );

        Crawler::new(fetcher.clone(), options())
            .crawl(SEED, 1)
            .await
            .unwrap();

        let docs_calls = fetcher
            .calls()
            .iter()
            .filter(|url| url.as_str() == "https://example.com/docs")
            .count();
        assert_eq!(docs_calls, 2);
    }

    #[tokio::test]
    async fn test_unique_frontier_fetches_each_url_once() {
        let fetcher = Arc::new(small_site());
        let crawler = Crawler::new(
            fetcher.clone(),
            CrawlOptions {
                unique_frontier: true,
                ..options()
            },
        );

        let report = crawler.crawl_with_report(SEED, 3).await.unwrap();

        assert_eq!(report.levels.len(), 2);
        assert_eq!(report.levels[1].frontier, 2);
        let mut calls = fetcher.calls();
        calls.sort();
        calls.dedup();
        assert_eq!(calls.len(), fetcher.calls().len());
    }

    #[tokio::test]
    async fn test_seed_failure_is_fatal() {
        let fetcher = Arc::new(ScriptedFetcher::new().failing(SEED));
        let err = Crawler::new(fetcher, options())
            .crawl(SEED, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_child_failures_are_absorbed() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(
                    SEED,
                    &[("Up", "https://example.com/up"), ("Down", "https://down.example/")],
                )
                .page("https://example.com/up", &[("Deeper", "https://example.com/deeper")])
                .failing("https://down.example/"),
        );

        let report = Crawler::new(fetcher, options())
            .crawl_with_report(SEED, 1)
            .await
            .unwrap();

        assert_eq!(report.levels[0].fetched, 1);
        assert_eq!(report.levels[0].failed, 1);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.record.links["Deeper"], "https://example.com/deeper");
    }

    #[tokio::test]
    async fn test_non_success_seed_has_no_children() {
        let fetcher = Arc::new(ScriptedFetcher::new().page_with_status(SEED, 404, &[]));
        let report = Crawler::new(fetcher.clone(), options())
            .crawl_with_report(SEED, 2)
            .await
            .unwrap();

        assert_eq!(report.record.status, 404);
        assert!(report.record.links.is_empty());
        assert!(report.levels.is_empty());
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_level_keeps_partial_links() {
        let fetcher = Arc::new(
            small_site().delay("https://example.com/b", Duration::from_secs(10)),
        );
        let crawler = Crawler::new(
            fetcher,
            CrawlOptions {
                batch_timeout: Duration::from_millis(300),
                ..options()
            },
        );

        let report = crawler.crawl_with_report(SEED, 1).await.unwrap();

        assert!(report.levels[0].timed_out);
        assert_eq!(report.record.links["C"], "https://example.com/c");
        assert!(!report.record.links.contains_key("D"));
    }

    #[tokio::test]
    async fn test_cancelled_crawl_fails() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher = Arc::new(small_site());
        let err = Crawler::new(fetcher, options())
            .with_cancellation(cancel)
            .crawl(SEED, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::BatchCanceled));
    }
}
