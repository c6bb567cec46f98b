//! Crawler module for page fetching, extraction, and run coordination
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with error classification and a retry wrapper
//! - HTML extraction of quote records and the next-page link
//! - The run state machine tying fetch, persist, and delay together

mod coordinator;
mod extractor;
mod fetcher;

pub use coordinator::{Harvester, RunSummary};
pub use extractor::{extract_page, ExtractedPage};
pub use fetcher::{build_http_client, fetch_page, fetch_with_retry, FetchError, RetryPolicy};

use crate::config::Config;
use crate::storage::SqliteStore;
use crate::HarvestError;
use std::path::Path;

/// Runs a complete harvest with the SQLite store from the configuration
///
/// This is the main entry point for a one-shot run: it opens the store,
/// builds a [`Harvester`], and drives it to completion.
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, recorded on the run row
///
/// # Returns
///
/// * `Ok(RunSummary)` - Run finished (normally or via external stop)
/// * `Err(HarvestError)` - Run failed; the reason is also on the run row
pub async fn harvest(config: Config, config_hash: &str) -> Result<RunSummary, HarvestError> {
    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
    let mut harvester = Harvester::new(config, config_hash, store)?;
    harvester.run().await
}
