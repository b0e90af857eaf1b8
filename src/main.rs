// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr so JSON output stays clean)
// 3. Run the bookmarks through the checker (launcher or worker pool)
// 4. Print the results and exit with 0 (all OK), 1 (problems found) or
//    2 (something went wrong)
// =============================================================================

mod cli;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bookmark_guardian::model::{filtered_sorted, LinkCollection, LinkGroup, UNSORTED_NAME};
use bookmark_guardian::{
    event_channel, CheckEvent, CheckerConfig, EventReceiver, GroupChecker, HttpTransport,
    SingleLinkChecker, SiteLink, Transport,
};
use cli::{Cli, Commands};
use report::CheckedList;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v / -q
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(?cli, "CLI arguments parsed");

    let config = cli.checker_config();
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);

    let lists = match &cli.command {
        Commands::Check { urls, label } => {
            handle_single_check(urls, label, &config, transport).await?
        }
        Commands::File { path, dedupe, .. } => {
            handle_file_check(path, *dedupe, &config, transport).await?
        }
    };

    report::print_results(&lists, cli.json)?;

    if report::problem_count(&lists) > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'check' subcommand: one site, checked through the launcher
async fn handle_single_check(
    urls: &[String],
    label: &str,
    config: &CheckerConfig,
    transport: Arc<dyn Transport>,
) -> Result<Vec<CheckedList>> {
    let site = SiteLink::default();
    for url in urls {
        site.append_link(url.as_str(), label)
            .with_context(|| format!("bad bookmark URL '{}'", url))?;
    }
    let site = Arc::new(site);

    let (tx, mut rx) = event_channel();
    let launcher = SingleLinkChecker::new(config, transport, tx);
    eprintln!("🔍 Checking {} URL(s) for '{}'", urls.len(), label);
    launcher.launch_check(Arc::clone(&site))?;

    while let Some(event) = rx.recv().await {
        if let CheckEvent::SiteChecked { changed, .. } = event {
            debug!(changed, "single check finished");
            break;
        }
    }

    Ok(vec![CheckedList {
        name: label.to_string(),
        sites: vec![site],
    }])
}

// Handles the 'file' subcommand: every group, one pool run at a time
async fn handle_file_check(
    path: &Path,
    dedupe: bool,
    config: &CheckerConfig,
    transport: Arc<dyn Transport>,
) -> Result<Vec<CheckedList>> {
    let mut collection = LinkCollection::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if dedupe {
        for group in &mut collection.groups {
            group.links = filtered_sorted(&group.links);
        }
        collection.unsorted = filtered_sorted(&collection.unsorted);
    }

    eprintln!(
        "📄 Loaded {} bookmark(s) in {} group(s), checking {} at a time",
        collection.site_count(),
        collection.groups.len(),
        config.pool_width()
    );

    let (tx, mut rx) = event_channel();
    let pool = GroupChecker::new(config, transport, tx);
    let mut lists = Vec::new();

    for group in collection.groups.iter().filter(|g| !g.is_empty()) {
        pool.set_group_to_check(group)?;
        lists.push(run_list(&pool, &mut rx, group).await?);
    }

    if !collection.unsorted.is_empty() {
        pool.set_unsorted_to_check(&collection)?;
        let unsorted = LinkGroup {
            name: UNSORTED_NAME.to_string(),
            links: collection.unsorted.clone(),
        };
        lists.push(run_list(&pool, &mut rx, &unsorted).await?);
    }

    Ok(lists)
}

// Starts the queued run and waits for its RunFinished event
async fn run_list(
    pool: &GroupChecker,
    rx: &mut EventReceiver,
    group: &LinkGroup,
) -> Result<CheckedList> {
    eprintln!("🌐 Checking '{}' ({} site(s))...", group.name, group.count());
    pool.start_checks()?;

    let mut changed_sites = 0;
    while let Some(event) = rx.recv().await {
        match event {
            CheckEvent::Started { site } => {
                debug!(url = ?site.url_at(0), "site check started");
            }
            CheckEvent::SiteChecked { changed, .. } => {
                if changed > 0 {
                    changed_sites += 1;
                }
            }
            CheckEvent::RunFinished { label } => {
                info!(run = %label, changed_sites, "group checked");
                return Ok(CheckedList {
                    name: group.name.clone(),
                    sites: group.links.clone(),
                });
            }
        }
    }

    Err(anyhow!("checker stopped before '{}' finished", group.name))
}
