// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Two subcommands, so a crawl and a search can never be asked for at once:
//   link-harvest crawl https://example.com --depth 2
//   link-harvest search rust
//
// Engine settings are global flags. They override values from --config,
// which in turn override the built-in defaults.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "link-harvest",
    version,
    about = "Crawl HTTPS pages breadth-first and search the links they contain",
    long_about = "link-harvest fetches a page, follows its links level by level up to the \
                  requested depth, and stores every anchor text/link pair it finds in SQLite. \
                  Pages crawled recently are served from the database instead of the network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a page and store the links found on it and below it
    ///
    /// Example: link-harvest crawl https://example.com --depth 2
    Crawl {
        /// Page to start from (https only)
        url: String,

        /// How many levels of links to follow below the page
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        depth: u32,

        /// Print the crawled record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search stored links by anchor text (case-sensitive substring)
    ///
    /// Example: link-harvest search Docs
    Search {
        /// Text to look for, at least 3 characters
        term: String,

        /// Print the hits as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Flags that override the configuration file
#[derive(Args, Debug, Default)]
pub struct Settings {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Concurrent fetch workers per level
    #[arg(long, global = true)]
    pub pool_size: Option<usize>,

    /// Deadline for each level, in seconds
    #[arg(long, global = true)]
    pub batch_timeout: Option<u64>,

    /// Timeout for a single request, in seconds
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Crawl a stored page again once it is older than this many hours
    #[arg(long, global = true)]
    pub recrawl_after_hours: Option<u64>,

    /// Fetch each URL at most once per crawl
    #[arg(long, global = true)]
    pub unique_frontier: bool,
}
