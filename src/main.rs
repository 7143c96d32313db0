// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Build the HTTP downloader and the crawl engine
// 3. Crawl, then shut the engine down
// 4. Print results and exit with a proper code
//    (0 = every page OK, 1 = some pages failed, 2 = error)
//
// Logs go to stderr (set RUST_LOG=debug to see every page), results go to
// stdout so `--json` output can be piped into other tools.
// =============================================================================

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use level_crawler::{CrawlEngine, CrawlResult, CrawlerConfig, HttpDownloader, PageError};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap prints its own diagnostic and exits for bad arguments
    let cli = Cli::parse();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = CrawlerConfig::new(
        cli.downloaders.get(),
        cli.extractors.get(),
        cli.per_host.get(),
    )?;
    let downloader = Arc::new(HttpDownloader::new()?);
    let engine = CrawlEngine::new(downloader, config)?;

    if !cli.json {
        println!("🔍 Crawling: {}", cli.url);
        println!("📊 Max crawl depth: {}", cli.depth);
    }

    // The engine is shut down on every path: explicitly here, or by Drop if
    // crawl() returns an error and `?` leaves early
    let result = engine.crawl(&cli.url, cli.depth.get()).await?;
    engine.shutdown().await;

    print_results(&result, cli.json)?;

    if result.errors.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Prints the results either as a table or JSON
fn print_results(result: &CrawlResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_table(result);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(result: &CrawlResult) {
    println!();
    println!("{:<60} {:<15} {:<30}", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(105));

    let mut downloaded: Vec<&String> = result.downloaded.iter().collect();
    downloaded.sort();
    for url in downloaded {
        // A downloaded page can still have an extraction error
        match result.errors.get(url) {
            Some(error) => println!(
                "{:<60} {:<15} {:<30}",
                truncate(url),
                format_status(error),
                error
            ),
            None => println!("{:<60} {:<15} {:<30}", truncate(url), "✅ OK", ""),
        }
    }

    let mut failed: Vec<(&String, &PageError)> = result
        .errors
        .iter()
        .filter(|(_, error)| error.is_fetch_stage())
        .collect();
    failed.sort_by(|a, b| a.0.cmp(b.0));
    for (url, error) in failed {
        println!("{:<60} {:<15} {:<30}", truncate(url), format_status(error), error);
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Downloaded: {}", result.downloaded.len());
    println!("   ❌ Errors: {}", result.errors.len());
}

fn truncate(url: &str) -> String {
    if url.chars().count() > 57 {
        let head: String = url.chars().take(57).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}

fn format_status(error: &PageError) -> &'static str {
    match error {
        PageError::AddressResolution(_) => "🌐 BAD ADDRESS",
        PageError::Fetch(_) => "❌ FETCH FAILED",
        PageError::Extraction(_) => "⚠️  NO LINKS",
    }
}
