// src/error.rs
// =============================================================================
// Error types for the crawler.
//
// There are two very different kinds of failure here:
//
// 1. CrawlError - something is wrong with how the engine was used
//    (depth of zero, a worker count of zero, submitting to a closed pool).
//    These are returned as Err(...) from the public API.
//
// 2. PageError - one address failed somewhere along the way. These are never
//    returned as Err(...). They are recorded in the CrawlResult next to the
//    address and the crawl carries on with the other addresses.
//
// Rust concepts:
// - thiserror: derives std::error::Error and Display from attributes
// - Serialize: lets us print PageError as part of the JSON output
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invocation-level errors from the engine and its building blocks
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Maximum depth must be at least 1 (depth 1 = just the seed page)
    #[error("Invalid depth {0}: the crawl depth must be at least 1")]
    InvalidDepth(usize),

    /// A configuration value was rejected (zero workers, zero per-host limit)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Work was submitted to a worker pool after it was shut down
    #[error("The {0} pool is shut down and no longer accepts work")]
    PoolClosed(&'static str),

    /// A unit tried to register with a level barrier that already drained
    #[error("Level {0} has already completed and accepts no more work")]
    LevelRetired(usize),
}

/// Why a single address ended up in the error mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "stage", content = "message", rename_all = "snake_case")]
pub enum PageError {
    /// The address could not be mapped to a host, so it was never scheduled
    #[error("Malformed address: {0}")]
    AddressResolution(String),

    /// The page could not be retrieved
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The page was retrieved but its links could not be extracted
    #[error("Link extraction failed: {0}")]
    Extraction(String),
}

impl PageError {
    /// True when the address itself was never successfully fetched
    ///
    /// Extraction failures happen after a successful fetch, so the address
    /// also shows up in the downloaded list.
    pub fn is_fetch_stage(&self) -> bool {
        !matches!(self, PageError::Extraction(_))
    }
}

/// Turns a caught panic payload into something we can store in a PageError
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_is_not_fetch_stage() {
        assert!(PageError::Fetch("HTTP 404".into()).is_fetch_stage());
        assert!(PageError::AddressResolution("no host".into()).is_fetch_stage());
        assert!(!PageError::Extraction("bad html".into()).is_fetch_stage());
    }

    #[test]
    fn test_page_error_json_shape() {
        let json = serde_json::to_value(PageError::Fetch("HTTP 500".into())).unwrap();
        assert_eq!(json["stage"], "fetch");
        assert_eq!(json["message"], "HTTP 500");
    }

    #[test]
    fn test_panic_message_from_str_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload), "panicked: boom");
    }
}
