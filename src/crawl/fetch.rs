// src/crawl/fetch.rs
// =============================================================================
// Fetches one page and extracts its links.
//
// Every failure stays inside the returned FetchResult, so a caller fetching
// many pages never loses the others because one went wrong:
// - the URL fails validation        -> FetchResult with a validation error
// - the request fails (DNS, TLS...) -> FetchResult with a transport error
// - the server answers non-2xx      -> valid FetchResult, status set, no links
// - the server answers 2xx          -> valid FetchResult with extracted links
//
// The response body is read chunk by chunk and capped, then handed to the
// extractor. The response is dropped on every return path, releasing the
// connection back to the client pool.
// =============================================================================

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::error::{CrawlError, CrawlResult, TransportKind};
use crate::models::FetchResult;
use crate::validate::validate_url;

use super::extract::extract_links;

/// Something that can turn a URL into a FetchResult
///
/// The worker pool and the depth orchestrator only talk to this trait, so
/// they can be driven by a scripted fetcher in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Fetches pages over HTTPS with reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    // Client is reference counted inside, clones share one connection pool
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration, max_body_bytes: usize) -> CrawlResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    // Reads the body until it ends or the byte cap is reached
    async fn read_body(&self, url: &Url, response: reqwest::Response) -> CrawlResult<String> {
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(url.as_str(), e))?;
            let room = self.max_body_bytes.saturating_sub(body.len());
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                log::debug!("body of {} truncated at {} bytes", url, self.max_body_bytes);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, raw_url: &str) -> FetchResult {
        let url = match validate_url(raw_url) {
            Ok(url) => url,
            Err(e) => return FetchResult::failed(raw_url, e),
        };

        log::debug!("fetching {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::failed(url.as_str(), transport_error(url.as_str(), e)),
        };

        self.read_page(&url, response).await
    }
}

impl HttpFetcher {
    // Turns an HTTP answer into a FetchResult: non-2xx keeps only the status,
    // 2xx bodies go through the link extractor
    async fn read_page(&self, url: &Url, response: reqwest::Response) -> FetchResult {
        let status = response.status();
        if !status.is_success() {
            log::debug!("{} answered HTTP {}, no links taken", url, status.as_u16());
            return FetchResult::page(url.as_str(), status.as_u16(), Default::default());
        }

        match self.read_body(url, response).await {
            Ok(html) => {
                let links = extract_links(url, &html);
                log::debug!("{} links found on {}", links.len(), url);
                FetchResult::page(url.as_str(), status.as_u16(), links)
            }
            Err(e) => FetchResult::failed(url.as_str(), e),
        }
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> CrawlError {
    CrawlError::Transport {
        url: url.to_string(),
        kind: TransportKind::classify(&error),
        message: error.to_string(),
    }
}
