// src/main.rs
// =============================================================================
// Entry point of the link-harvest CLI.
//
// What happens here:
// 1. Set up logging (RUST_LOG overrides the default "info" level)
// 2. Parse command-line arguments and build the configuration
// 3. Dispatch to the crawl or search handler
// 4. Exit with a proper code (0 = success, 1 = search found nothing, 2 = error)
// =============================================================================

mod cli;
mod config;
mod crawl;
mod error;
mod models;
mod store;
mod validate;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, Settings};
use config::CrawlConfig;
use crawl::{refresh, Crawler, HttpFetcher, RefreshOutcome};
use models::{PageRecord, SearchHit};
use store::{SqliteStore, Store};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = done
//   Ok(1) = search found no links
//   Err   = anything that stopped the command
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.settings)?;

    match cli.command {
        Commands::Crawl { url, depth, json } => handle_crawl(&config, &url, depth as usize, json).await,
        Commands::Search { term, json } => handle_search(&config, &term, json),
    }
}

// Defaults, then the config file, then command-line flags
fn load_config(settings: &Settings) -> Result<CrawlConfig> {
    let mut config = match &settings.config {
        Some(path) => CrawlConfig::from_file(path)?,
        None => CrawlConfig::default(),
    };

    if let Some(db) = &settings.db {
        config.database = db.clone();
    }
    if let Some(pool_size) = settings.pool_size {
        config.pool_size = pool_size;
    }
    if let Some(secs) = settings.batch_timeout {
        config.batch_timeout_secs = secs;
    }
    if let Some(secs) = settings.request_timeout {
        config.request_timeout_secs = secs;
    }
    if let Some(hours) = settings.recrawl_after_hours {
        config.recrawl_after_hours = hours;
    }
    if settings.unique_frontier {
        config.unique_frontier = true;
    }

    config.validate()?;
    log::debug!("configuration: {:?}", config);
    Ok(config)
}

async fn handle_crawl(config: &CrawlConfig, url: &str, depth: usize, json: bool) -> Result<i32> {
    if !json {
        println!("🔍 Crawling: {}", url);
        println!("📊 Depth: {}", depth);
    }

    let store = open_store(config)?;
    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout(), config.max_body_bytes)?);

    // Ctrl-C stops the crawl; nothing is stored for a cancelled crawl
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping the crawl");
            on_interrupt.cancel();
        }
    });

    let crawler = Crawler::new(fetcher, config.crawl_options()).with_cancellation(cancel);

    let outcome = match refresh(&store, &crawler, url, depth, config.recrawl_after(), Utc::now()).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_interruption() => bail!("{}, nothing was stored", e),
        Err(e) => return Err(e).with_context(|| format!("crawl of {} failed", url)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(outcome.record())?);
        return Ok(0);
    }

    match &outcome {
        RefreshOutcome::Fresh(record) => println!(
            "✅ Stored copy is fresh (crawled {}), nothing fetched",
            record.last_crawled_at.to_rfc3339()
        ),
        RefreshOutcome::Crawled(record) => {
            println!("📄 New page stored with {} link(s)", record.links.len())
        }
        RefreshOutcome::Recrawled { record, new_children } => println!(
            "🔄 Page crawled again: {} link(s) found, {} new",
            record.links.len(),
            new_children.len()
        ),
    }

    print_record(outcome.record());

    let record = outcome.record();
    println!("📊 Summary:");
    println!("   {}", record);
    println!("   🔗 Stored links for this page: {}", store.child_count(&record.url)?);
    println!("   📋 Pages in database: {}", store.page_count()?);
    if outcome.was_fetched() {
        log::info!("page was crawled successfully: {}", record);
    }

    Ok(0)
}

fn handle_search(config: &CrawlConfig, term: &str, json: bool) -> Result<i32> {
    let term = validate::validate_search_term(term)?;
    let store = open_store(config)?;

    let hits = store
        .search_by_text(term)
        .with_context(|| format!("search for '{}' failed", term))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        println!("🔍 Links whose text contains '{}':\n", term);
        print_hits(&hits);
    }

    Ok(if hits.is_empty() { 1 } else { 0 })
}

fn open_store(config: &CrawlConfig) -> Result<SqliteStore> {
    SqliteStore::open(&config.database)
        .with_context(|| format!("cannot open database {}", config.database.display()))
}

fn print_record(record: &PageRecord) {
    println!();
    println!("{:<40} {:<60}", "TEXT", "URL");
    println!("{}", "=".repeat(101));
    for (text, url) in &record.links {
        println!("{:<40} {:<60}", truncate(text, 37), truncate(url, 57));
    }
    println!();
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("   No links found");
        return;
    }

    println!("{:<40} {:<60}", "TEXT", "URL");
    println!("{}", "=".repeat(101));
    for hit in hits {
        println!("{:<40} {:<60}", truncate(&hit.text, 37), hit.url);
    }
    println!();
    println!("📋 Total: {}", hits.len());
}

// Shortens long values for the table, on a character boundary
fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let short: String = value.chars().take(max_chars).collect();
        format!("{}...", short)
    } else {
        value.to_string()
    }
}
