// src/download/html.rs
// =============================================================================
// Extracts links from fetched HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to resolve relative links against the page URL.
//
// Note that scraper::Html is not Send, so HtmlDocument keeps the raw text and
// only parses it inside extract_links. That way the (CPU heavy) parsing runs
// on the extraction pool instead of on a fetch worker.
// =============================================================================

use super::Document;
use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use url::Url;

/// A page fetched over HTTP, waiting to be parsed for links
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    url: String,
    body: String,
    content_type: Option<String>,
}

impl HtmlDocument {
    pub fn new(
        url: impl Into<String>,
        body: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            content_type,
        }
    }

    // A missing Content-Type header is treated as HTML, servers often omit it
    fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(value) => {
                let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                mime == "text/html" || mime == "application/xhtml+xml"
            }
        }
    }
}

impl Document for HtmlDocument {
    fn extract_links(&self) -> Result<Vec<String>> {
        if !self.is_html() {
            return Err(anyhow!(
                "not an HTML document (content-type: {})",
                self.content_type.as_deref().unwrap_or("unknown")
            ));
        }
        extract_html_links(&self.body, &self.url)
    }
}

// Extracts all crawlable links from HTML content
//
// Parameters:
//   html: the HTML content to parse
//   base_url: the URL of the page (for resolving relative links)
//
// Returns: absolute http/https URLs with fragments removed, in page order.
// Duplicates are kept; the engine deduplicates globally.
pub fn extract_html_links(html: &str, base_url: &str) -> Result<Vec<String>> {
    let base =
        Url::parse(base_url).map_err(|e| anyhow!("Invalid base URL '{}': {}", base_url, e))?;

    let document = Html::parse_document(html);
    let selector =
        Selector::parse("a[href]").map_err(|e| anyhow!("Invalid link selector: {:?}", e))?;

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(&base, href))
        .collect();

    Ok(links)
}

// Resolves a link (possibly relative) to an absolute URL
//
// Examples (base = "https://example.com/page"):
//   "/docs"              -> Some("https://example.com/docs")
//   "https://other.com"  -> Some("https://other.com/")
//   "#section"           -> None (same page)
//   "mailto:a@b.c"       -> None (not crawlable)
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    if href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href.trim()).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    // "page#a" and "page#b" are the same page for a crawler
    url.set_fragment(None);
    Some(url.to_string())
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why does extract_links return Result when the old link checker did not?
//    - The engine has to tell "page had no links" apart from "page could not
//      be parsed for links". The second one is recorded as an Extraction
//      error for the page, the first one is just an empty Vec.
//
// 2. Why Url::join for everything?
//    - join() handles absolute URLs too ("https://other.com" replaces the
//      base entirely), so we don't need a separate Url::parse attempt.
// -----------------------------------------------------------------------------
