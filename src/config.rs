// src/config.rs
// =============================================================================
// Engine configuration.
//
// The engine needs three numbers for its whole lifetime:
// - downloaders: how many pages may be fetched at once (all hosts together)
// - extractors:  how many pages may be parsed for links at once
// - per_host:    how many pages of ONE host may be fetched at once
//
// All three must be positive. A zero would mean "never run anything", which
// would hang the crawl forever, so we reject it up front.
// =============================================================================

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizes of the worker pools and the per-host concurrency cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Number of fetch workers
    pub downloaders: usize,
    /// Number of link extraction workers
    pub extractors: usize,
    /// Maximum number of concurrent fetches against a single host
    pub per_host: usize,
    /// How long shutdown waits for idle workers to exit before warning
    #[serde(with = "millis")]
    pub shutdown_grace: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            downloaders: 1,
            extractors: 1,
            per_host: 1,
            shutdown_grace: Duration::from_millis(100),
        }
    }
}

impl CrawlerConfig {
    /// Builds a validated config with the default shutdown grace period
    pub fn new(downloaders: usize, extractors: usize, per_host: usize) -> Result<Self, CrawlError> {
        let config = Self {
            downloaders,
            extractors,
            per_host,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        let fields = [
            ("downloaders", self.downloaders),
            ("extractors", self.extractors),
            ("per_host", self.per_host),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(CrawlError::InvalidConfig(format!(
                    "{} must be a positive number",
                    name
                )));
            }
        }
        Ok(())
    }
}

// serde has no built-in Duration format that reads well in JSON
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
