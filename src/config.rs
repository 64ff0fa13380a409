// src/config.rs
// =============================================================================
// Runtime configuration.
//
// Values are layered: built-in defaults, then an optional JSON file, then
// command-line flags (applied in main.rs). Every field has a serde default,
// so a config file only needs the keys it wants to change:
//
//   { "pool_size": 8, "recrawl_after_hours": 168 }
// =============================================================================

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawl::CrawlOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Concurrent fetch workers per batch
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Deadline for one whole batch, in seconds
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Timeout for a single HTTP request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// A stored page older than this is crawled again
    #[serde(default = "default_recrawl_after_hours")]
    pub recrawl_after_hours: u64,

    /// Response bytes handed to the link extractor, the rest is dropped
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Skip URLs already fetched earlier in the same crawl
    #[serde(default)]
    pub unique_frontier: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            pool_size: default_pool_size(),
            batch_timeout_secs: default_batch_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            recrawl_after_hours: default_recrawl_after_hours(),
            max_body_bytes: default_max_body_bytes(),
            unique_frontier: false,
        }
    }
}

impl CrawlConfig {
    /// Loads a JSON config file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            bail!("pool_size must be at least 1");
        }
        if self.batch_timeout_secs == 0 {
            bail!("batch_timeout_secs must be greater than 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than 0");
        }
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than 0");
        }
        if recrawl_threshold(self.recrawl_after_hours).is_none() {
            bail!("recrawl_after_hours is out of range");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Age after which a stored page is stale; saturates for out of range hours
    pub fn recrawl_after(&self) -> chrono::Duration {
        recrawl_threshold(self.recrawl_after_hours).unwrap_or_else(chrono::Duration::max_value)
    }

    /// Options for the depth orchestrator and its worker pool
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            pool_size: self.pool_size,
            batch_timeout: Duration::from_secs(self.batch_timeout_secs),
            unique_frontier: self.unique_frontier,
        }
    }
}

fn recrawl_threshold(hours: u64) -> Option<chrono::Duration> {
    i64::try_from(hours).ok().and_then(chrono::Duration::try_hours)
}

fn default_database() -> PathBuf {
    PathBuf::from("crawl.db")
}

/// One worker per available core, or 4 if that cannot be determined
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_batch_timeout_secs() -> u64 {
    5 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_recrawl_after_hours() -> u64 {
    24
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
