// src/crawl/extract.rs
// =============================================================================
// Extracts anchor text -> link pairs from one HTML document.
//
// Rules for each <a> element, in document order:
// - It needs an href. The href is trimmed and resolved against the page URL,
//   so relative links become absolute. An href that cannot be resolved is
//   logged and skipped; the rest of the document is still scanned.
// - Only https results are kept, the same scheme the fetcher accepts. Plain
//   http, mailto:, javascript: and the like are dropped here.
// - The anchor text is taken only from the node *directly* after the opening
//   tag, and only if that node is text. `<a href="/x"><b>Hi</b></a>` has an
//   element there, so it contributes nothing.
// - Text is trimmed; empty text contributes nothing.
// - A later anchor with the same text replaces the earlier link.
//
// scraper (html5ever) never fails on bad markup, it recovers, so there is no
// fatal tokenizer error to stop at: the whole document is always scanned in
// one forward pass over the parsed tree.
// =============================================================================

use scraper::{Html, Node};
use url::Url;

use crate::models::LinkMap;
use crate::validate::ALLOWED_SCHEME;

/// Extracts all text/link pairs from `html`, resolving hrefs against `base`
///
/// Example:
///   html = "<a href='/docs'>Docs</a>"
///   base = "https://example.com"
///   result = {"Docs": "https://example.com/docs"}
pub fn extract_links(base: &Url, html: &str) -> LinkMap {
    let mut links = LinkMap::new();

    let document = Html::parse_document(html);

    for node in document.tree.root().descendants() {
        let element = match node.value() {
            Node::Element(element) if element.name() == "a" => element,
            _ => continue,
        };

        let link = match element.attr("href").and_then(|href| resolve_href(base, href)) {
            Some(link) => link,
            None => continue,
        };

        // Adjacency rule: the very next node has to be text
        let text = match node.first_child().and_then(|child| child.value().as_text()) {
            Some(text) => text.trim(),
            None => continue,
        };

        if text.is_empty() {
            continue;
        }

        links.insert(text.to_string(), link);
    }

    links
}

// Resolves a possibly-relative href to an absolute https URL
//
// Examples:
//   base = "https://example.com/page/"
//   href = "/docs"              -> Some("https://example.com/docs")
//   href = "../other"           -> Some("https://example.com/other")
//   href = "https://other.com"  -> Some("https://other.com/")
//   href = "http://other.com"   -> None (not https)
//   href = "mailto:me@x.com"    -> None
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    let resolved = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("skipping malformed href '{}' on {}: {}", href, base, e);
            return None;
        }
    };

    if resolved.scheme() != ALLOWED_SCHEME {
        log::debug!("skipping non-https link {}", resolved);
        return None;
    }

    Some(resolved.to_string())
}
