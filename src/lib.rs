// src/lib.rs
// =============================================================================
// level-crawler: a concurrent, depth-bounded web crawler.
//
// Give it a seed URL and a depth. It fetches pages level by level
// (breadth-first), never runs more than `per_host` fetches against one host
// at a time, and returns which pages were downloaded and which ones failed.
//
// Modules:
// - crawl:    the engine (scheduling, throttling, worker pools, barriers)
// - download: the Downloader / Document traits and the HTTP implementation
// - config:   CrawlerConfig
// - error:    CrawlError and PageError
// =============================================================================

pub mod config;
pub mod crawl;
pub mod download;
pub mod error;

pub use config::CrawlerConfig;
pub use crawl::{CrawlEngine, CrawlResult};
pub use download::{host_of, Document, Downloader, HttpDownloader};
pub use error::{CrawlError, PageError};
