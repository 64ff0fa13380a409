// src/error.rs
// =============================================================================
// Error types shared by the crawl engine.
//
// Failures are classified by how far they are allowed to travel:
// - MalformedUrl / SchemeNotAllowed: fatal to one URL, absorbed by a batch
// - Transport: fatal to one fetch, absorbed by a batch, fatal for the seed
// - BatchTimeout / BatchCanceled: why a batch returned early
// - Store: anything the persistence layer reports (except "not found",
//   which the Store contract models as Option::None)
//
// A malformed href inside a document is not an error value at all; the
// extractor logs it and moves on.
// =============================================================================

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

/// Result alias used across the engine
pub type CrawlResult<T> = Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("scheme '{scheme}' of '{url}' is not allowed, only https is crawled")]
    SchemeNotAllowed { url: String, scheme: String },

    #[error("request to {url} failed ({kind}): {message}")]
    Transport {
        url: String,
        kind: TransportKind,
        message: String,
    },

    #[error("crawl stopped: timeout of {0:?} exceeded")]
    BatchTimeout(Duration),

    #[error("crawl stopped: canceled by user")]
    BatchCanceled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl CrawlError {
    /// True for the two variants that describe an interrupted batch
    pub fn is_interruption(&self) -> bool {
        matches!(self, CrawlError::BatchTimeout(_) | CrawlError::BatchCanceled)
    }
}

/// Why a single HTTP exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Dns,
    Tls,
    Redirect,
    Body,
    Other,
}

impl TransportKind {
    /// Sorts a reqwest error into a transport kind
    ///
    /// reqwest only exposes a few predicates, so DNS and TLS problems are
    /// recognised from the error text.
    pub fn classify(error: &reqwest::Error) -> Self {
        let text = format!("{error:?}").to_lowercase();

        if error.is_timeout() {
            TransportKind::Timeout
        } else if error.is_redirect() {
            TransportKind::Redirect
        } else if text.contains("dns") {
            TransportKind::Dns
        } else if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            TransportKind::Tls
        } else if error.is_connect() {
            TransportKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Other
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connection failed",
            TransportKind::Dns => "dns error",
            TransportKind::Tls => "tls error",
            TransportKind::Redirect => "too many redirects",
            TransportKind::Body => "body error",
            TransportKind::Other => "error",
        };
        f.write_str(label)
    }
}
