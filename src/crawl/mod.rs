// src/crawl/mod.rs
// =============================================================================
// The crawl engine.
//
// Submodules, leaves first:
// - extract: anchor text -> link pairs from one HTML document
// - fetch: one HTTP GET + extraction, failures kept inside the result
// - pool: a batch of URLs fetched by N concurrent workers
// - depth: breadth-first expansion of a seed, one batch per level
// - recrawl: staleness, pruning of known children, and persistence
// =============================================================================

mod depth;
mod extract;
mod fetch;
mod pool;
mod recrawl;

#[cfg(test)]
pub(crate) mod testing;

pub use depth::{CrawlOptions, Crawler};
pub use fetch::HttpFetcher;
pub use recrawl::{prune_known_children, refresh, RefreshOutcome};
