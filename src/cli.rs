// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - check: one bookmark with one or more alternative URLs
// - file:  every group of a bookmark collection file, through the worker pool
//
// Flags shared by both (timeouts, redirects, output format, verbosity) are
// declared on the top-level struct with `global = true`, so they can be
// given before or after the subcommand.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

use bookmark_guardian::config::{
    CheckerConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
};

#[derive(Parser, Debug)]
#[command(
    name = "bookmark-guardian",
    version,
    about = "Checks bookmarks for broken, moved and HTTPS-upgraded links",
    long_about = "bookmark-guardian checks every URL of your bookmarks and reports which ones \
                  are missing, forbidden, failing or redirected somewhere else. Redirects to the \
                  same page (HTTPS upgrades, trailing slashes, tracking wrappers) are not reported."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output results in JSON format instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// Seconds to wait for each request
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout: u64,

    /// Redirect hops to follow before giving up on a URL
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Keep http:// URLs even when the server upgrades them to https://
    #[arg(long, global = true)]
    pub no_https_upgrade: bool,

    /// Use GET for every request instead of trying HEAD first
    #[arg(long, global = true)]
    pub get_only: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides this
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a single bookmark
    ///
    /// Example: bookmark-guardian check http://example.com https://example.org --label Example
    Check {
        /// The bookmark's URLs (alternatives for the same site)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Label stored with each URL
        #[arg(long, default_value = "Bookmark")]
        label: String,
    },

    /// Check every bookmark in a collection file
    ///
    /// Example: bookmark-guardian file bookmarks.json --workers 5
    File {
        /// JSON collection: { "groups": [...], "unsorted": [...] }
        path: PathBuf,

        /// Number of sites checked at the same time
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Drop duplicate bookmarks and sort each group before checking
        #[arg(long)]
        dedupe: bool,
    },
}

impl Cli {
    /// Engine settings from the parsed flags.
    pub fn checker_config(&self) -> CheckerConfig {
        let workers = match &self.command {
            Commands::File { workers, .. } => *workers,
            Commands::Check { .. } => DEFAULT_WORKERS,
        };
        CheckerConfig {
            workers,
            timeout: Duration::from_secs(self.timeout),
            max_redirects: self.max_redirects,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auto_https: !self.no_https_upgrade,
            head_first: !self.get_only,
        }
    }

    /// Default log filter for tracing-subscriber.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
