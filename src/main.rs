//! Quotegrab main entry point
//!
//! This is the command-line interface for the quotegrab harvester.

use clap::Parser;
use quotegrab::config::load_config_with_hash;
use quotegrab::crawler::Harvester;
use quotegrab::storage::{QuoteStore, SqliteStore};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Quotegrab: an incremental quote harvester
///
/// Quotegrab walks a paginated quote listing, extracts quote records, and
/// persists them into SQLite without ever storing the same (text, author)
/// pair twice, even across repeated or interrupted runs.
#[derive(Parser, Debug)]
#[command(name = "quotegrab")]
#[command(version)]
#[command(about = "Incremental harvester for paginated quote listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("quotegrab=info,warn"),
            1 => EnvFilter::new("quotegrab=debug,info"),
            2 => EnvFilter::new("quotegrab=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &quotegrab::config::Config) {
    println!("=== Quotegrab Dry Run ===\n");

    println!("Harvester Configuration:");
    println!("  Start URL: {}", config.harvester.start_url);
    println!("  Page delay: {}s", config.harvester.page_delay_secs);
    println!("  Fetch timeout: {}s", config.harvester.fetch_timeout_secs);
    match config.harvester.max_pages {
        Some(max) => println!("  Page ceiling: {}", max),
        None => println!("  Page ceiling: unbounded"),
    }

    println!("\nRetry Policy:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Backoff: {}ms", config.retry.backoff_ms);

    println!("\nUser Agent:");
    println!("  {}/{}", config.user_agent.name, config.user_agent.version);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start harvesting at {}", config.harvester.start_url);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &quotegrab::config::Config) -> anyhow::Result<()> {
    use std::path::Path;

    println!("Database: {}\n", config.storage.database_path);

    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;

    println!("=== Store Statistics ===\n");
    println!("  Quotes:  {}", store.count_quotes()?);
    println!("  Authors: {}", store.count_authors()?);
    println!("  Tags:    {}", store.count_tags()?);

    if let Some(run) = store.get_latest_run()? {
        println!("\nLast run (id {}):", run.id);
        println!("  Started:  {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("still running")
        );
        println!("  Status:   {}", run.status.to_db_string());
        if let Some(error) = &run.error {
            println!("  Error:    {}", error);
        }
    } else {
        println!("\nNo runs recorded yet.");
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: quotegrab::config::Config, config_hash: &str) -> anyhow::Result<()> {
    use std::path::Path;

    tracing::info!("Starting harvest from {}", config.harvester.start_url);

    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
    let mut harvester = Harvester::new(config, config_hash, store)?;

    // Wire Ctrl-C to the stop flag; the run ends cleanly between pages
    let stop = harvester.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current page");
            stop.store(true, Ordering::Relaxed);
        }
    });

    match harvester.run().await {
        Ok(summary) => {
            tracing::info!(
                "Harvest finished: {} pages, {} inserted, {} duplicates",
                summary.pages,
                summary.inserted,
                summary.duplicates
            );
            if summary.stopped {
                tracing::warn!("Run was stopped early by an external signal");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
