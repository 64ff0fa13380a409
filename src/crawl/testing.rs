// src/crawl/testing.rs
// =============================================================================
// A scripted PageFetcher for tests. It answers from a table instead of the
// network and records every URL it was asked for.
// =============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{CrawlError, TransportKind};
use crate::models::{FetchResult, LinkMap};

use super::fetch::PageFetcher;

#[derive(Debug, Clone)]
enum Reply {
    Page { status: u16, links: LinkMap },
    Fail,
}

#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `url` with HTTP 200 and the given (text, link) pairs
    pub fn page(self, url: &str, links: &[(&str, &str)]) -> Self {
        self.page_with_status(url, 200, links)
    }

    pub fn page_with_status(mut self, url: &str, status: u16, links: &[(&str, &str)]) -> Self {
        let links = links
            .iter()
            .map(|(text, link)| (text.to_string(), link.to_string()))
            .collect();
        self.replies
            .insert(url.to_string(), Reply::Page { status, links });
        self
    }

    /// Answers `url` with a transport error
    pub fn failing(mut self, url: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::Fail);
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Delay applied to every URL without its own delay
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Every URL fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.calls.lock().unwrap().push(url.to_string());

        let delay = self.delays.get(url).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(url) {
            Some(Reply::Page { status, links }) => FetchResult::page(url, *status, links.clone()),
            Some(Reply::Fail) | None => FetchResult::failed(
                url,
                CrawlError::Transport {
                    url: url.to_string(),
                    kind: TransportKind::Connect,
                    message: "connection refused".to_string(),
                },
            ),
        }
    }
}
