// src/crawl/results.rs
// =============================================================================
// Shared collections used during one crawl.
//
// - ResultAggregator: collects downloaded addresses and per-address errors
//   from all the workers at once
// - Frontier: the "next level" queue that extraction units append to
// - CrawlResult: the plain, finished result handed back to the caller
//
// Workers only ever add to these collections. Reading happens once, after
// the last level has drained.
// =============================================================================

use crate::error::PageError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// What a finished crawl produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Every address that was fetched successfully (order is not meaningful)
    pub downloaded: Vec<String>,
    /// Address -> why it failed
    pub errors: HashMap<String, PageError>,
}

impl CrawlResult {
    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded.iter().any(|u| u == url)
    }

    /// Addresses that were never fetched successfully
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(|(_, error)| error.is_fetch_stage())
            .map(|(url, _)| url.as_str())
    }
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    downloaded: Mutex<Vec<String>>,
    errors: DashMap<String, PageError>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_downloaded(&self, url: String) {
        tracing::debug!(%url, "downloaded");
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
    }

    pub fn record_error(&self, url: String, error: PageError) {
        tracing::debug!(%url, %error, "page failed");
        self.errors.insert(url, error);
    }

    /// Takes the accumulated outcome, leaving the aggregator empty
    pub fn finish(&self) -> CrawlResult {
        let downloaded = std::mem::take(
            &mut *self.downloaded.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let errors = self
            .errors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        self.errors.clear();

        CrawlResult { downloaded, errors }
    }
}

/// Addresses waiting for the next level
#[derive(Debug, Default)]
pub struct Frontier {
    urls: Mutex<Vec<String>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: String) {
        self.lock().push(url);
    }

    pub fn extend(&self, urls: impl IntoIterator<Item = String>) {
        self.lock().extend(urls);
    }

    /// Swaps the collected addresses out, leaving an empty frontier behind
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
