//! Harvest coordinator - the fetch/extract/persist loop
//!
//! This module drives one harvest run: it holds the page cursor, invokes
//! the fetcher and extractor, forwards records to the store via idempotent
//! upserts, applies the inter-page delay, and decides termination and
//! failure escalation.

use crate::config::Config;
use crate::crawler::extractor::extract_page;
use crate::crawler::fetcher::{build_http_client, fetch_with_retry, RetryPolicy};
use crate::record::Record;
use crate::storage::{QuoteStore, RunStatus, UpsertOutcome};
use crate::{ConfigError, HarvestError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Consecutive per-record storage failures treated as the store being
/// unreachable; escalates the run to Failed.
const STORAGE_FAILURE_LIMIT: u32 = 5;

/// Traversal state of one harvest run
///
/// The cursor in `Running` is strictly derived from the previous page's
/// "next" pointer, so a well-behaved site always drives the run to `Done`.
#[derive(Debug)]
enum CrawlState {
    /// Fetching pages; holds the current page cursor
    Running(Url),

    /// No next address remains; final batch still to persist
    Draining(Vec<Record>),

    /// Traversal ended normally
    Done,
}

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages successfully fetched and extracted
    pub pages: u32,

    /// Records extracted across all pages (before dedup)
    pub records_seen: u64,

    /// Records newly inserted into the store
    pub inserted: u64,

    /// Records whose (text, author) pair was already present
    pub duplicates: u64,

    /// Containers skipped for missing sub-structure
    pub skipped_malformed: u64,

    /// Records skipped on non-collision storage errors
    pub storage_skipped: u64,

    /// True when an external stop signal ended the run early
    pub stopped: bool,
}

/// Drives a single harvest run
///
/// The harvester exclusively owns its HTTP client and store for the
/// duration of the run; every exit path (success, fatal error, external
/// stop) finalizes the run row before returning.
pub struct Harvester<S: QuoteStore> {
    config: Config,
    store: S,
    client: reqwest::Client,
    retry: RetryPolicy,
    run_id: i64,
    stop: Arc<AtomicBool>,
    summary: RunSummary,
    consecutive_storage_failures: u32,
}

impl<S: QuoteStore> Harvester<S> {
    /// Creates a harvester for one run
    ///
    /// Probes store connectivity and records the run row up front, so an
    /// unreachable store fails fast before any page is fetched.
    pub fn new(config: Config, config_hash: &str, mut store: S) -> Result<Self, HarvestError> {
        // Fail fast if the store is unreachable
        store.probe().map_err(|e| {
            ConfigError::Validation(format!("Storage unreachable at startup: {}", e))
        })?;

        let run_id = store.create_run(config_hash)?;

        let timeout = Duration::from_secs(config.harvester.fetch_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        let retry = RetryPolicy::from_config(&config.retry);

        Ok(Self {
            config,
            store,
            client,
            retry,
            run_id,
            stop: Arc::new(AtomicBool::new(false)),
            summary: RunSummary::default(),
            consecutive_storage_failures: 0,
        })
    }

    /// Handle for requesting an external stop
    ///
    /// The flag is honored at the top of each iteration, after the previous
    /// page's batch is fully persisted.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// The ID of the run row this harvester writes under
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Read access to the underlying store (statistics, tests)
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the harvest to completion
    ///
    /// Returns the run summary on a normal or externally-stopped finish.
    /// Fetch errors and systemic storage failure finalize the run row as
    /// failed and propagate verbatim.
    pub async fn run(&mut self) -> Result<RunSummary, HarvestError> {
        let start_url = Url::parse(&self.config.harvester.start_url)?;
        tracing::info!("Starting harvest run {} at {}", self.run_id, start_url);

        let delay = Duration::from_secs(self.config.harvester.page_delay_secs);
        let mut state = CrawlState::Running(start_url);

        loop {
            state = match state {
                CrawlState::Running(cursor) => {
                    if self.stop.load(Ordering::Relaxed) {
                        tracing::info!("Stop requested, ending run before {}", cursor);
                        self.summary.stopped = true;
                        self.finalize(RunStatus::Interrupted, None)?;
                        return Ok(self.summary.clone());
                    }

                    let ceiling = self
                        .config
                        .harvester
                        .max_pages
                        .filter(|max| self.summary.pages >= *max);

                    if let Some(max) = ceiling {
                        tracing::warn!(
                            "Page ceiling of {} reached, ending traversal at {}",
                            max,
                            cursor
                        );
                        CrawlState::Done
                    } else {
                        self.step(cursor, delay).await?
                    }
                }

                CrawlState::Draining(batch) => {
                    self.persist_batch(&batch)?;
                    CrawlState::Done
                }

                CrawlState::Done => break,
            };
        }

        self.finalize(RunStatus::Completed, None)?;
        tracing::info!(
            "Harvest run {} done: {} pages, {} inserted, {} duplicates, {} malformed, {} storage skips",
            self.run_id,
            self.summary.pages,
            self.summary.inserted,
            self.summary.duplicates,
            self.summary.skipped_malformed,
            self.summary.storage_skipped
        );

        Ok(self.summary.clone())
    }

    /// One iteration: fetch the cursor page, persist its batch, derive the
    /// next state, and apply the inter-page delay when traversal continues
    async fn step(&mut self, cursor: Url, delay: Duration) -> Result<CrawlState, HarvestError> {
        let body = match fetch_with_retry(&self.client, &cursor, self.retry).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Fetch failed for {}: {}", cursor, e);
                self.finalize_failed(&e.to_string());
                return Err(e.into());
            }
        };

        let page = extract_page(&body, &cursor);
        self.summary.pages += 1;
        self.summary.records_seen += page.records.len() as u64;
        self.summary.skipped_malformed += page.skipped as u64;

        tracing::info!(
            "Page {} ({}): {} records, {} malformed, next: {}",
            self.summary.pages,
            cursor,
            page.records.len(),
            page.skipped,
            page.next_page.is_some()
        );

        if page.records.is_empty() && page.next_page.is_some() {
            // Transient, continuable condition; "no next address" is the
            // sole termination signal.
            tracing::warn!("Page {} yielded no records but has a next link", cursor);
        }

        match page.next_page {
            Some(next) => {
                self.persist_batch(&page.records)?;
                tokio::time::sleep(delay).await;
                Ok(CrawlState::Running(next))
            }
            None => Ok(CrawlState::Draining(page.records)),
        }
    }

    /// Persists one page's batch of records via idempotent upserts
    ///
    /// A key collision is the dedup invariant at work and only bumps a
    /// counter. Any other storage error skips the record; a streak of
    /// STORAGE_FAILURE_LIMIT such errors escalates to a failed run.
    fn persist_batch(&mut self, records: &[Record]) -> Result<(), HarvestError> {
        for record in records {
            match self.store.upsert_quote(record, self.run_id) {
                Ok(UpsertOutcome::Inserted) => {
                    self.summary.inserted += 1;
                    self.consecutive_storage_failures = 0;
                    tracing::debug!("Inserted quote by {}", record.author());
                }
                Ok(UpsertOutcome::AlreadyPresent) => {
                    self.summary.duplicates += 1;
                    self.consecutive_storage_failures = 0;
                    tracing::info!(
                        "Quote by {} already present, skipping duplicate",
                        record.author()
                    );
                }
                Err(e) => {
                    self.summary.storage_skipped += 1;
                    self.consecutive_storage_failures += 1;
                    tracing::warn!(
                        "Storage error for quote by {} ({} consecutive): {}",
                        record.author(),
                        self.consecutive_storage_failures,
                        e
                    );

                    if self.consecutive_storage_failures >= STORAGE_FAILURE_LIMIT {
                        let err = HarvestError::StorageUnreachable {
                            failures: self.consecutive_storage_failures,
                            last: e.to_string(),
                        };
                        self.finalize_failed(&err.to_string());
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// Finalizes the run row; called exactly once on every exit path
    fn finalize(&mut self, status: RunStatus, error: Option<&str>) -> Result<(), HarvestError> {
        self.store.finish_run(self.run_id, status, error)?;
        Ok(())
    }

    /// Best-effort finalization for failure branches
    ///
    /// The store may be the very thing that failed, so an error writing
    /// the run row is logged and discarded; the original failure reason
    /// must reach the caller unchanged.
    fn finalize_failed(&mut self, reason: &str) {
        if let Err(e) = self
            .store
            .finish_run(self.run_id, RunStatus::Failed, Some(reason))
        {
            tracing::error!("Could not record run failure '{}': {}", reason, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HarvesterConfig, RetryConfig, StorageConfig, UserAgentConfig};
    use crate::storage::{
        RunRecord, SqliteStore, StorageError, StorageResult, StoredQuote,
    };

    fn test_config(start_url: &str) -> Config {
        Config {
            harvester: HarvesterConfig {
                start_url: start_url.to_string(),
                page_delay_secs: 1,
                fetch_timeout_secs: 5,
                max_pages: None,
            },
            retry: RetryConfig {
                max_attempts: 1,
                backoff_ms: 10,
            },
            user_agent: UserAgentConfig {
                name: "TestHarvester".to_string(),
                version: "1.0".to_string(),
            },
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
            },
        }
    }

    #[test]
    fn test_new_creates_run_row() {
        let store = SqliteStore::new_in_memory().unwrap();
        let harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        let run = harvester.store().get_run(harvester.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "hash");
    }

    #[test]
    fn test_stop_handle_is_shared() {
        let store = SqliteStore::new_in_memory().unwrap();
        let harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        let handle = harvester.stop_handle();
        handle.store(true, Ordering::Relaxed);
        assert!(harvester.stop.load(Ordering::Relaxed));
    }

    /// Store whose upserts always fail; run-row finalization failure is
    /// configurable so both halves of the escalation path can be exercised
    struct FlakyStore {
        fail_finish: bool,
        finished: Option<(RunStatus, Option<String>)>,
    }

    impl FlakyStore {
        fn new(fail_finish: bool) -> Self {
            Self {
                fail_finish,
                finished: None,
            }
        }
    }

    impl QuoteStore for FlakyStore {
        fn probe(&self) -> StorageResult<()> {
            Ok(())
        }

        fn create_run(&mut self, _config_hash: &str) -> StorageResult<i64> {
            Ok(1)
        }

        fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
            Err(StorageError::RunNotFound(run_id))
        }

        fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
            Ok(None)
        }

        fn finish_run(
            &mut self,
            _run_id: i64,
            status: RunStatus,
            error: Option<&str>,
        ) -> StorageResult<()> {
            if self.fail_finish {
                return Err(StorageError::Database("store gone".to_string()));
            }
            self.finished = Some((status, error.map(|s| s.to_string())));
            Ok(())
        }

        fn upsert_quote(
            &mut self,
            _record: &Record,
            _run_id: i64,
        ) -> StorageResult<UpsertOutcome> {
            Err(StorageError::Database("store gone".to_string()))
        }

        fn get_quote(&self, _text: &str, _author: &str) -> StorageResult<Option<StoredQuote>> {
            Ok(None)
        }

        fn list_quotes(&self) -> StorageResult<Vec<StoredQuote>> {
            Ok(Vec::new())
        }

        fn count_quotes(&self) -> StorageResult<u64> {
            Ok(0)
        }

        fn count_authors(&self) -> StorageResult<u64> {
            Ok(0)
        }

        fn count_tags(&self) -> StorageResult<u64> {
            Ok(0)
        }
    }

    fn batch(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(format!("quote {}", i), "Author", vec![]).unwrap())
            .collect()
    }

    #[test]
    fn test_storage_errors_below_threshold_are_absorbed() {
        let store = FlakyStore::new(false);
        let mut harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        // One short of the limit: skip-and-continue, no escalation
        let result = harvester.persist_batch(&batch(4));
        assert!(result.is_ok());
        assert_eq!(harvester.summary.storage_skipped, 4);
    }

    #[test]
    fn test_consecutive_storage_failures_escalate() {
        let store = FlakyStore::new(false);
        let mut harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        let result = harvester.persist_batch(&batch(6));
        assert!(matches!(
            result,
            Err(HarvestError::StorageUnreachable { failures: 5, .. })
        ));

        // The first four errors were absorbed before the fifth escalated
        assert_eq!(harvester.summary.storage_skipped, 5);

        // The run row carries the escalated reason
        let (status, error) = harvester.store().finished.clone().unwrap();
        assert_eq!(status, RunStatus::Failed);
        assert!(error.unwrap().contains("unreachable"));
    }

    #[test]
    fn test_escalation_reason_survives_failing_finalize() {
        // The store is gone for the run-row write too; the original
        // failure kind must still reach the caller unchanged
        let store = FlakyStore::new(true);
        let mut harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        let result = harvester.persist_batch(&batch(5));
        assert!(matches!(
            result,
            Err(HarvestError::StorageUnreachable { failures: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_before_first_fetch_interrupts_run() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut harvester =
            Harvester::new(test_config("https://quotes.example.com/"), "hash", store).unwrap();

        harvester.stop_handle().store(true, Ordering::Relaxed);
        let summary = harvester.run().await.unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.pages, 0);
        let run = harvester.store().get_run(harvester.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
    }
}
