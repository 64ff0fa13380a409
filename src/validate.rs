// src/validate.rs
// =============================================================================
// Input validation.
//
// validate_url is the only gate a URL passes before it is fetched:
// 1. It must parse as an absolute URL written with "://" after the scheme
//    ("https:example.com" is refused even though the parser would fix it up)
// 2. Its scheme, exactly as typed, must be "https"
// 3. The returned Url has scheme and host lowercased; path and query are
//    kept as given
//
// The `url` crate lowercases scheme and host while parsing, so the scheme
// check looks at the raw input instead of the parsed value. "HTTPS://..."
// is therefore rejected.
// =============================================================================

use url::Url;

use crate::error::{CrawlError, CrawlResult};

/// The only scheme the crawler fetches
pub const ALLOWED_SCHEME: &str = "https";

/// Shortest accepted search term (after trimming)
pub const MIN_SEARCH_TERM_CHARS: usize = 3;

/// Parses `raw` as an absolute https URL and normalises it
pub fn validate_url(raw: &str) -> CrawlResult<Url> {
    let parsed = Url::parse(raw).map_err(|e| CrawlError::MalformedUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = raw_scheme(raw).unwrap_or_else(|| parsed.scheme());
    if scheme != ALLOWED_SCHEME {
        return Err(CrawlError::SchemeNotAllowed {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        });
    }

    if !has_authority(raw) {
        return Err(CrawlError::MalformedUrl {
            url: raw.to_string(),
            reason: "expected '//' after the scheme".to_string(),
        });
    }

    Ok(parsed)
}

fn trim_leading(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| c <= ' ')
}

// The scheme as it appears in the input, before any case folding
fn raw_scheme(raw: &str) -> Option<&str> {
    trim_leading(raw).split_once(':').map(|(scheme, _)| scheme)
}

fn has_authority(raw: &str) -> bool {
    trim_leading(raw)
        .split_once(':')
        .map_or(false, |(_, rest)| rest.starts_with("//"))
}

/// Trims a search term and enforces the minimum length
pub fn validate_search_term(term: &str) -> anyhow::Result<&str> {
    let trimmed = term.trim();
    if trimmed.chars().count() < MIN_SEARCH_TERM_CHARS {
        anyhow::bail!(
            "search term '{}' is too short, use at least {} characters",
            trimmed,
            MIN_SEARCH_TERM_CHARS
        );
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_url_is_normalised() {
        let url = validate_url("https://Example.com/X").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
        // path keeps its case
        assert_eq!(url.path(), "/X");
        assert_eq!(url.as_str(), "https://example.com/X");
    }

    #[test]
    fn test_query_is_untouched() {
        let url = validate_url("https://EXAMPLE.com/a?Q=Yes").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?Q=Yes");
    }

    #[test]
    fn test_http_is_rejected() {
        let err = validate_url("http://example.com").unwrap_err();
        assert!(matches!(err, CrawlError::SchemeNotAllowed { ref scheme, .. } if scheme == "http"));
    }

    #[test]
    fn test_scheme_check_is_case_sensitive() {
        let err = validate_url("HTTPS://example.com").unwrap_err();
        assert!(matches!(err, CrawlError::SchemeNotAllowed { .. }));
    }

    #[test]
    fn test_other_schemes_are_rejected() {
        for raw in ["ftp://example.com/file", "mailto:someone@example.com"] {
            let err = validate_url(raw).unwrap_err();
            assert!(matches!(err, CrawlError::SchemeNotAllowed { .. }), "{raw}");
        }
    }

    #[test]
    fn test_malformed_urls() {
        for raw in ["", "not a url", "/relative/path", "https://"] {
            let err = validate_url(raw).unwrap_err();
            assert!(matches!(err, CrawlError::MalformedUrl { .. }), "{raw}");
        }
    }

    #[test]
    fn test_scheme_without_slashes_is_malformed() {
        for raw in ["https:example.com", "https:/example.com/path"] {
            let err = validate_url(raw).unwrap_err();
            assert!(matches!(err, CrawlError::MalformedUrl { .. }), "{raw}");
        }
    }

    #[test]
    fn test_search_term_rules() {
        assert_eq!(validate_search_term("  rust  ").unwrap(), "rust");
        assert!(validate_search_term("ab").is_err());
        assert!(validate_search_term("   ").is_err());
    }
}
