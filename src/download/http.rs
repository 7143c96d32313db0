// src/download/http.rs
// =============================================================================
// The default Downloader: fetches pages over HTTP with reqwest.
//
// Key functionality:
// - One shared reqwest Client (connection pooling across all fetch workers)
// - Non-2xx responses count as a failed fetch
// - Transport errors are turned into short readable messages
//   (timeout, DNS, TLS, redirect loop)
//
// The returned HtmlDocument is not parsed here. Parsing is the extraction
// pool's job.
// =============================================================================

use super::{Document, HtmlDocument};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Fetches pages with a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

/// Builder for HttpDownloader client settings
#[derive(Debug, Clone)]
pub struct HttpDownloaderBuilder {
    timeout: Duration,
    max_redirects: usize,
    user_agent: String,
}

impl Default for HttpDownloaderBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpDownloaderBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpDownloader> {
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .user_agent(self.user_agent)
            .build()?;
        Ok(HttpDownloader { client })
    }
}

impl HttpDownloader {
    pub fn builder() -> HttpDownloaderBuilder {
        HttpDownloaderBuilder::default()
    }

    /// Downloader with the default settings (10s timeout, 5 redirects)
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    async fn fetch(&self, url: &str) -> Result<HtmlDocument> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!(describe_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Keep the post-redirect URL so relative links resolve correctly
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| anyhow!(describe_error(&e)))?;

        tracing::debug!(url, bytes = body.len(), "fetched page");
        Ok(HtmlDocument::new(final_url, body, content_type))
    }
}

#[async_trait]
impl super::Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>> {
        let document = self.fetch(url).await?;
        Ok(Box::new(document))
    }
}

// Categorizes reqwest errors into short messages
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn describe_error(error: &reqwest::Error) -> String {
    let error_string = error.to_string();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "Could not resolve hostname".to_string()
        } else {
            "Connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::Downloader;
    use httpmock::{Method::GET, MockServer};

    #[tokio::test]
    async fn test_download_html_page() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("content-type", "text/html")
                    .body(r#"<a href="/about">About</a>"#);
            })
            .await;

        let downloader = HttpDownloader::new().unwrap();
        let document = downloader.download(&server.url("/")).await.unwrap();
        let links = document.extract_links().unwrap();

        assert_eq!(links, vec![server.url("/about")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let downloader = HttpDownloader::new().unwrap();
        let err = match downloader.download(&server.url("/missing")).await {
            Ok(_) => panic!("404 should not produce a document"),
            Err(e) => e,
        };
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[tokio::test]
    async fn test_custom_user_agent_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/").header("user-agent", "docs-bot/2.0");
                then.status(200).body("<p>hello</p>");
            })
            .await;

        let downloader = HttpDownloader::builder()
            .user_agent("docs-bot/2.0")
            .build()
            .unwrap();
        assert!(downloader.download(&server.url("/")).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_limit_is_enforced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/old");
                then.status(301).header("location", "/new");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/new");
                then.status(200).body("<p>moved</p>");
            })
            .await;

        let strict = HttpDownloader::builder().max_redirects(0).build().unwrap();
        let err = match strict.download(&server.url("/old")).await {
            Ok(_) => panic!("redirect should be refused"),
            Err(e) => e,
        };
        assert_eq!(err.to_string(), "Too many redirects");

        let relaxed = HttpDownloader::builder().max_redirects(1).build().unwrap();
        assert!(relaxed.download(&server.url("/old")).await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_is_described() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;

        let downloader = HttpDownloader::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let err = match downloader.download(&server.url("/slow")).await {
            Ok(_) => panic!("slow response should time out"),
            Err(e) => e,
        };
        assert_eq!(err.to_string(), "Request timed out");
    }
}
