// src/crawl/mod.rs
// =============================================================================
// This module is the crawl engine.
//
// Submodules:
// - engine:   CrawlEngine, the breadth-first orchestrator
// - throttle: HostThrottle, caps concurrent fetches per host
// - pool:     WorkerPool, a fixed number of async workers (fetch / extract)
// - barrier:  LevelBarrier, waits until a depth level has fully resolved
// - results:  ResultAggregator, Frontier and the final CrawlResult
//
// Only the engine and the result types are needed by callers. The building
// blocks are public too so they can be reused and tested on their own.
// =============================================================================

pub mod barrier;
mod engine;
pub mod pool;
mod results;
pub mod throttle;

pub use engine::CrawlEngine;
pub use results::{CrawlResult, Frontier, ResultAggregator};
