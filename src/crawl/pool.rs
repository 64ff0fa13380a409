// src/crawl/pool.rs
// =============================================================================
// Fetches a batch of URLs with a fixed number of concurrent workers.
//
// Layout (all tasks share one CancellationToken):
//
//   dispatcher --(url queue)--> worker 1..N --(result channel)--> aggregator
//
// - The dispatcher pushes URLs into a bounded queue and stops as soon as the
//   token fires.
// - Each worker pulls one URL at a time, fetches it, and sends the
//   FetchResult on. Waiting for a URL and fetching both race the token.
// - The aggregator (the caller's task) is the only code touching the merged
//   LinkMap, so it needs no lock. It races incoming results against the
//   batch deadline and the caller's cancellation.
//
// One URL failing never stops the batch: its error is recorded in
// `BatchOutcome::failures` and the other workers keep going. When the
// deadline passes or the caller cancels, the token is fired, results that
// already arrived are kept, and the outcome says why the batch stopped.
//
// Results are merged in arrival order, which differs between runs. When two
// pages use the same anchor text for different links, which one survives is
// not defined.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::CrawlError;
use crate::models::{merge_links, FetchResult, LinkMap};

use super::fetch::PageFetcher;

/// Deadline for a whole batch when nothing else is configured
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A URL whose fetch failed, and why
#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub error: CrawlError,
}

/// Everything a batch produced
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Links of every successful fetch, merged by anchor text
    pub links: LinkMap,
    /// Number of URLs fetched without error
    pub fetched: usize,
    pub failures: Vec<FetchFailure>,
    /// BatchTimeout or BatchCanceled when the batch stopped early
    pub interrupted: Option<CrawlError>,
}

impl BatchOutcome {
    fn record(&mut self, result: FetchResult) {
        match result.error {
            Some(error) => {
                self.failures.push(FetchFailure {
                    url: result.source_url,
                    error,
                });
            }
            None => {
                self.fetched += 1;
                merge_links(&mut self.links, result.links);
            }
        }
    }
}

/// Fetches `urls` with `pool_size` workers under one `timeout`
///
/// `cancel` is the caller's token; cancelling it stops this batch too.
pub async fn crawl_batch(
    fetcher: Arc<dyn PageFetcher>,
    urls: Vec<String>,
    pool_size: usize,
    timeout: Duration,
    cancel: &CancellationToken,
) -> BatchOutcome {
    let pool_size = pool_size.max(1);
    let token = cancel.child_token();

    log::debug!("dispatching {} url(s) to {} worker(s)", urls.len(), pool_size);

    let (url_tx, url_rx) = mpsc::channel::<String>(pool_size);
    let url_rx = Arc::new(Mutex::new(url_rx));
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<FetchResult>();

    let mut tasks = JoinSet::new();
    tasks.spawn(dispatch(urls, url_tx, token.clone()));
    for worker_id in 0..pool_size {
        tasks.spawn(work(
            worker_id,
            Arc::clone(&fetcher),
            Arc::clone(&url_rx),
            result_tx.clone(),
            token.clone(),
        ));
    }

    // Workers hold the remaining senders; the channel closes when they exit
    drop(result_tx);

    let mut outcome = BatchOutcome::default();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                outcome.interrupted = Some(CrawlError::BatchCanceled);
                break;
            }
            next = result_rx.recv() => match next {
                Some(result) => outcome.record(result),
                None => break,
            },
            _ = &mut deadline => {
                outcome.interrupted = Some(CrawlError::BatchTimeout(timeout));
                break;
            }
        }
    }

    if let Some(reason) = outcome.interrupted.take() {
        token.cancel();

        // Results that were already sent are still valid
        while let Ok(result) = result_rx.try_recv() {
            outcome.record(result);
        }

        log::warn!(
            "{} after {} page(s), {} failure(s)",
            reason,
            outcome.fetched,
            outcome.failures.len()
        );
        outcome.interrupted = Some(reason);

        // Workers leave on their own once they see the token
        tasks.detach_all();
    } else {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::error!("crawl task ended abnormally: {}", e);
            }
        }
    }

    outcome
}

async fn dispatch(urls: Vec<String>, url_tx: mpsc::Sender<String>, token: CancellationToken) {
    for url in urls {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("dispatcher stopped by cancellation");
                return;
            }
            sent = url_tx.send(url) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
    // Dropping url_tx here tells the workers the queue is finished
}

async fn work(
    worker_id: usize,
    fetcher: Arc<dyn PageFetcher>,
    url_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    result_tx: mpsc::UnboundedSender<FetchResult>,
    token: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = async { url_rx.lock().await.recv().await } => next,
        };

        let Some(url) = next else {
            break;
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = fetcher.fetch(&url) => result,
        };

        if result_tx.send(result).is_err() {
            break;
        }
    }

    log::debug!("worker {} finished", worker_id);
}
