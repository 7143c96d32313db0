// src/crawl/engine.rs
// =============================================================================
// The crawl orchestrator.
//
// How a crawl works:
// 1. Put the seed address in the "next" frontier
// 2. For every level (0, 1, ... max_depth - 1):
//    a. Take everything out of the "next" frontier (this is now the current
//       level). Stop early if it is empty.
//    b. Skip addresses we have already scheduled in this crawl
//    c. Find the host, register a token on the level barrier, and hand a
//       fetch unit to that host's throttle
//    d. Wait on the barrier until every fetch (and every extraction those
//       fetches spawned) has finished
// 3. Hand back what the ResultAggregator collected
//
// A fetch unit downloads the page, records it, and if there is at least one
// more level to explore, spawns an extraction unit on the extraction pool.
// The extraction unit appends the discovered links to the "next" frontier.
//
// Nothing inside a unit is allowed to escape: errors AND panics from the
// downloader or the document become PageError records. An escaping failure
// would leave a barrier token behind and the crawl would never finish.
// =============================================================================

use super::barrier::{LevelBarrier, LevelToken};
use super::pool::WorkerPool;
use super::results::{CrawlResult, Frontier, ResultAggregator};
use super::throttle::HostThrottle;
use crate::config::CrawlerConfig;
use crate::download::{host_of, Document, Downloader};
use crate::error::{panic_message, CrawlError, PageError};
use dashmap::{DashMap, DashSet};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub struct CrawlEngine {
    downloader: Arc<dyn Downloader>,
    config: CrawlerConfig,
    fetch_pool: Arc<WorkerPool>,
    extract_pool: Arc<WorkerPool>,
    hosts: DashMap<String, Arc<HostThrottle>>,
}

// Everything the units of a single crawl share
struct CrawlState {
    downloader: Arc<dyn Downloader>,
    extract_pool: Arc<WorkerPool>,
    results: ResultAggregator,
    next: Frontier,
    max_depth: usize,
}

impl CrawlEngine {
    /// Creates the engine and starts both worker pools
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(
        downloader: Arc<dyn Downloader>,
        config: CrawlerConfig,
    ) -> Result<Self, CrawlError> {
        config.validate()?;

        let fetch_pool = Arc::new(WorkerPool::new("fetch", config.downloaders)?);
        let extract_pool = Arc::new(WorkerPool::new("extract", config.extractors)?);

        Ok(Self {
            downloader,
            config,
            fetch_pool,
            extract_pool,
            hosts: DashMap::new(),
        })
    }

    /// Number of distinct hosts this engine has throttles for
    pub fn known_hosts(&self) -> usize {
        self.hosts.len()
    }

    /// Crawls breadth-first from `seed`, visiting at most `max_depth` levels
    ///
    /// Depth 1 fetches just the seed. Per-address failures never make this
    /// return Err; they end up in `CrawlResult::errors`.
    pub async fn crawl(&self, seed: &str, max_depth: usize) -> Result<CrawlResult, CrawlError> {
        if max_depth == 0 {
            return Err(CrawlError::InvalidDepth(max_depth));
        }

        let state = Arc::new(CrawlState {
            downloader: Arc::clone(&self.downloader),
            extract_pool: Arc::clone(&self.extract_pool),
            results: ResultAggregator::new(),
            next: Frontier::new(),
            max_depth,
        });
        let visited: DashSet<String> = DashSet::new();

        tracing::info!(seed, max_depth, "starting crawl");
        state.next.push(seed.to_string());

        for level in 0..max_depth {
            let current = state.next.take();
            if current.is_empty() {
                tracing::debug!(level, "frontier is empty, stopping early");
                break;
            }

            let (barrier, own) = LevelBarrier::open(level);
            let mut scheduled = 0;

            for url in current {
                // First scheduling wins, even if it happened on an earlier level
                if !visited.insert(url.clone()) {
                    continue;
                }

                let host = match host_of(&url) {
                    Ok(host) => host,
                    Err(error) => {
                        state.results.record_error(url, error);
                        continue;
                    }
                };

                let token = barrier.register()?;
                let unit = fetch_page(Arc::clone(&state), url, level, token).boxed();
                self.throttle_for(host).submit(unit);
                scheduled += 1;
            }

            tracing::info!(level, scheduled, "level scheduled");
            barrier.wait_drained(own).await;
        }

        let result = state.results.finish();
        tracing::info!(
            downloaded = result.downloaded.len(),
            errors = result.errors.len(),
            "crawl finished"
        );
        Ok(result)
    }

    /// Closes both pools and waits up to the configured grace period
    ///
    /// Returns the number of workers that had not exited in time.
    pub async fn shutdown(self) -> usize {
        let grace = self.config.shutdown_grace;
        let (extract, fetch) = tokio::join!(
            self.extract_pool.shutdown(grace),
            self.fetch_pool.shutdown(grace)
        );
        extract + fetch
    }

    fn throttle_for(&self, host: String) -> Arc<HostThrottle> {
        if let Some(throttle) = self.hosts.get(&host) {
            return throttle.value().clone();
        }

        self.hosts
            .entry(host.clone())
            .or_insert_with(|| {
                tracing::debug!(%host, limit = self.config.per_host, "new host");
                Arc::new(HostThrottle::new(
                    host.clone(),
                    self.config.per_host,
                    Arc::clone(&self.fetch_pool),
                ))
            })
            .value()
            .clone()
    }
}

impl Drop for CrawlEngine {
    // Covers callers that never reach shutdown(), e.g. on an early `?`
    fn drop(&mut self) {
        self.extract_pool.close();
        self.fetch_pool.close();
    }
}

// The fetch unit. `token` is released when this future completes or is dropped.
async fn fetch_page(state: Arc<CrawlState>, url: String, level: usize, token: LevelToken) {
    let outcome = AssertUnwindSafe(state.downloader.download(&url))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(document)) => {
            if state.max_depth - level > 1 {
                schedule_extraction(&state, &url, document, &token);
            }
            state.results.record_downloaded(url);
        }
        Ok(Err(error)) => {
            state.results.record_error(url, PageError::Fetch(format!("{:#}", error)));
        }
        Err(payload) => {
            state.results.record_error(url, PageError::Fetch(panic_message(payload)));
        }
    }

    drop(token);
}

fn schedule_extraction(
    state: &Arc<CrawlState>,
    url: &str,
    document: Box<dyn Document>,
    token: &LevelToken,
) {
    // Registered while the fetch token is still held, so the level stays open
    let extract_token = match token.register_sibling() {
        Ok(extract_token) => extract_token,
        Err(error) => {
            state
                .results
                .record_error(url.to_string(), PageError::Extraction(error.to_string()));
            return;
        }
    };

    tracing::trace!(%url, level = extract_token.level(), "scheduling link extraction");
    let unit = extract_links(Arc::clone(state), url.to_string(), document, extract_token).boxed();
    if let Err(error) = state.extract_pool.submit(unit) {
        state
            .results
            .record_error(url.to_string(), PageError::Extraction(error.to_string()));
    }
}

// The extraction unit. Parsing runs on a blocking thread; the pool worker
// waiting for it is what bounds how many pages are parsed at once.
async fn extract_links(
    state: Arc<CrawlState>,
    url: String,
    document: Box<dyn Document>,
    token: LevelToken,
) {
    let outcome = tokio::task::spawn_blocking(move || document.extract_links()).await;

    match outcome {
        Ok(Ok(links)) => {
            tracing::debug!(%url, found = links.len(), "extracted links");
            state.next.extend(links);
        }
        Ok(Err(error)) => {
            state.results.record_error(url, PageError::Extraction(format!("{:#}", error)));
        }
        Err(join_error) => {
            let message = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                join_error.to_string()
            };
            state.results.record_error(url, PageError::Extraction(message));
        }
    }

    drop(token);
}
