// src/download/mod.rs
// =============================================================================
// The seam between the crawl engine and the outside world.
//
// The engine never talks to the network itself. It only needs three things:
// - Downloader: turn an address into a Document (may fail)
// - Document:   list the outbound addresses in a page (may fail)
// - host_of:    figure out which host an address belongs to (may fail)
//
// Submodules:
// - http: the real Downloader, built on reqwest
// - html: the real Document, parsed with scraper
//
// Tests swap in their own in-memory Downloader so the engine can be checked
// without any network access.
// =============================================================================

mod html;
mod http;

pub use html::{extract_html_links, HtmlDocument};
pub use http::{HttpDownloader, HttpDownloaderBuilder};

use crate::error::PageError;
use async_trait::async_trait;
use url::Url;

/// Fetches pages by address
///
/// Implementations must be shareable between fetch workers, so Send + Sync.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> anyhow::Result<Box<dyn Document>>;
}

/// A fetched page that can be asked for its outbound links
///
/// extract_links is plain (non-async) CPU work. The engine runs it on a
/// blocking thread owned by the extraction pool.
pub trait Document: Send + Sync {
    fn extract_links(&self) -> anyhow::Result<Vec<String>>;
}

/// Returns the host of an address, e.g. "example.com" for
/// "https://example.com/docs"
pub fn host_of(url: &str) -> Result<String, PageError> {
    let parsed = Url::parse(url)
        .map_err(|e| PageError::AddressResolution(format!("'{}': {}", url, e)))?;

    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| PageError::AddressResolution(format!("'{}' has no host", url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of_http_url() {
        assert_eq!(host_of("https://example.com/docs?page=2").unwrap(), "example.com");
    }

    #[test]
    fn test_host_of_keeps_subdomain() {
        assert_eq!(host_of("http://docs.rs/tokio").unwrap(), "docs.rs");
        assert_eq!(host_of("http://api.example.com:8080/").unwrap(), "api.example.com");
    }

    #[test]
    fn test_host_of_relative_address_fails() {
        let err = host_of("/just/a/path").unwrap_err();
        assert!(matches!(err, PageError::AddressResolution(_)));
    }

    #[test]
    fn test_host_of_without_host_fails() {
        let err = host_of("mailto:someone@example.com").unwrap_err();
        assert!(err.to_string().contains("has no host"));
    }
}
