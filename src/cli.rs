// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Usage:
//   level-crawler <URL> [DEPTH] [DOWNLOADERS] [EXTRACTORS] [PER_HOST] [--json]
//
// Every number is optional and defaults to 1. clap rejects zero, negative or
// non-numeric values with a readable message before the crawler ever starts.
// =============================================================================

use clap::Parser;
use std::num::NonZeroUsize;

#[derive(Parser, Debug)]
#[command(
    name = "level-crawler",
    version,
    about = "Crawl a website breadth-first with per-host concurrency limits",
    long_about = "level-crawler downloads a page, follows its links level by level up to the \
                  given depth, and reports which pages were downloaded and which ones failed. \
                  No more than PER_HOST pages are fetched from one host at the same time."
)]
pub struct Cli {
    /// URL to start crawling from (e.g., https://example.com)
    pub url: String,

    /// How many levels to crawl. 1 = just the starting page,
    /// 2 = the starting page and every page it links to, etc.
    #[arg(default_value = "1")]
    pub depth: NonZeroUsize,

    /// Number of pages downloaded at the same time (all hosts together)
    #[arg(default_value = "1")]
    pub downloaders: NonZeroUsize,

    /// Number of pages parsed for links at the same time
    #[arg(default_value = "1")]
    pub extractors: NonZeroUsize,

    /// Number of pages downloaded at the same time from one host
    #[arg(default_value = "1")]
    pub per_host: NonZeroUsize,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why NonZeroUsize instead of usize?
//    - A depth or worker count of 0 makes no sense (nothing would ever run)
//    - NonZeroUsize implements FromStr and refuses "0", so clap does the
//      validation for us and prints a proper error message
//
// 2. Positional arguments with defaults
//    - Positional args are filled left to right, so to set PER_HOST you also
//      have to give DEPTH, DOWNLOADERS and EXTRACTORS
// -----------------------------------------------------------------------------
