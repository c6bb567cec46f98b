//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::Record;
use crate::storage::{RunRecord, RunStatus, StoredQuote, UpsertOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The upsert contract is what makes repeated and restarted runs safe:
/// `upsert_quote` inserts only if the `(text, author)` key is absent and
/// reports a collision as [`UpsertOutcome::AlreadyPresent`], never as an
/// error.
pub trait QuoteStore {
    // ===== Connectivity =====

    /// Probes connectivity with a trivial query
    ///
    /// Called once at startup so an unreachable store fails the run
    /// before any page is fetched.
    fn probe(&self) -> StorageResult<()>;

    // ===== Run Management =====

    /// Creates a new harvest run in the running state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Finalizes a run with its terminal status and optional error reason
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        error: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Quote Management =====

    /// Idempotent upsert keyed on (text, author)
    ///
    /// Insert-if-absent semantics: when the key already exists the stored
    /// row (including its tags) is left untouched and the call reports
    /// [`UpsertOutcome::AlreadyPresent`].
    fn upsert_quote(&mut self, record: &Record, run_id: i64) -> StorageResult<UpsertOutcome>;

    /// Gets a stored quote by its dedup key, with tags in stored order
    fn get_quote(&self, text: &str, author: &str) -> StorageResult<Option<StoredQuote>>;

    /// Lists all stored quotes in insertion order, with tags
    fn list_quotes(&self) -> StorageResult<Vec<StoredQuote>>;

    // ===== Statistics =====

    /// Total number of stored quotes
    fn count_quotes(&self) -> StorageResult<u64>;

    /// Number of distinct authors
    fn count_authors(&self) -> StorageResult<u64>;

    /// Number of distinct tags
    fn count_tags(&self) -> StorageResult<u64>;
}
