//! Storage module for persisting harvested quotes
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Idempotent quote upserts keyed on (text, author)
//! - Run tracking with final status and error reason

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{QuoteStore, StorageError, StorageResult};

/// Outcome of an idempotent upsert
///
/// A key collision is not an error; it is the dedup invariant at work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was new and has been inserted
    Inserted,

    /// A record with the same (text, author) pair already exists;
    /// stored content is unchanged
    AlreadyPresent,
}

/// Represents a stored quote row with its tags
#[derive(Debug, Clone)]
pub struct StoredQuote {
    pub id: i64,
    pub text: String,
    pub author: String,
    /// Tags in their original document order
    pub tags: Vec<String>,
    pub inserted_at: String,
    pub first_seen_run: i64,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub error: Option<String>,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
