//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the QuoteStore trait.

use crate::record::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{QuoteStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredQuote, UpsertOutcome};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a database at the given path
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_tags(&self, quote_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM quote_tags WHERE quote_id = ?1 ORDER BY position")?;
        let tags = stmt
            .query_map(params![quote_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    fn row_to_quote(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredQuote> {
        Ok(StoredQuote {
            id: row.get(0)?,
            text: row.get(1)?,
            author: row.get(2)?,
            tags: Vec::new(), // filled in by the caller
            inserted_at: row.get(3)?,
            first_seen_run: row.get(4)?,
        })
    }
}

impl QuoteStore for SqliteStore {
    // ===== Connectivity =====

    fn probe(&self) -> StorageResult<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, error FROM runs WHERE id = ?1",
        )?;

        let run = stmt
            .query_row(params![run_id], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                    error: row.get(5)?,
                })
            })
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        Ok(run)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, error
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                    error: row.get(5)?,
                })
            })
            .optional()?;

        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, error, run_id],
        )?;
        Ok(())
    }

    // ===== Quote Management =====

    fn upsert_quote(&mut self, record: &Record, run_id: i64) -> StorageResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();

        // One transaction per record: the quote row and its tags land
        // together or not at all.
        let tx = self.conn.transaction()?;

        // Insert-if-absent; zero rows changed means the key already exists.
        let changed = tx.execute(
            "INSERT OR IGNORE INTO quotes (text, author, inserted_at, first_seen_run)
             VALUES (?1, ?2, ?3, ?4)",
            params![record.text(), record.author(), now, run_id],
        )?;

        if changed == 0 {
            return Ok(UpsertOutcome::AlreadyPresent);
        }

        // New row: attach tags in document order
        let quote_id = tx.last_insert_rowid();
        for (position, tag) in record.tags().iter().enumerate() {
            tx.execute(
                "INSERT INTO quote_tags (quote_id, position, tag) VALUES (?1, ?2, ?3)",
                params![quote_id, position as i64, tag],
            )?;
        }
        tx.commit()?;

        Ok(UpsertOutcome::Inserted)
    }

    fn get_quote(&self, text: &str, author: &str) -> StorageResult<Option<StoredQuote>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, author, inserted_at, first_seen_run
             FROM quotes WHERE text = ?1 AND author = ?2",
        )?;

        let quote = stmt
            .query_row(params![text, author], |row| self.row_to_quote(row))
            .optional()?;

        match quote {
            Some(mut q) => {
                q.tags = self.load_tags(q.id)?;
                Ok(Some(q))
            }
            None => Ok(None),
        }
    }

    fn list_quotes(&self) -> StorageResult<Vec<StoredQuote>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, author, inserted_at, first_seen_run FROM quotes ORDER BY id",
        )?;

        let quotes = stmt
            .query_map([], |row| self.row_to_quote(row))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(quotes.len());
        for mut quote in quotes {
            quote.tags = self.load_tags(quote.id)?;
            out.push(quote);
        }

        Ok(out)
    }

    // ===== Statistics =====

    fn count_quotes(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_authors(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT author) FROM quotes", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    fn count_tags(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT tag) FROM quote_tags", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, author: &str, tags: &[&str]) -> Record {
        Record::new(text, author, tags.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    fn store_with_run() -> (SqliteStore, i64) {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let run_id = store.create_run("test-hash").unwrap();
        (store, run_id)
    }

    #[test]
    fn test_probe_succeeds() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.probe().is_ok());
    }

    #[test]
    fn test_upsert_inserts_new_quote() {
        let (mut store, run_id) = store_with_run();
        let r = record("to be", "Hamlet", &["life", "choice"]);

        let outcome = store.upsert_quote(&r, run_id).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(store.count_quotes().unwrap(), 1);
    }

    #[test]
    fn test_upsert_collision_reports_already_present() {
        let (mut store, run_id) = store_with_run();
        let r = record("to be", "Hamlet", &["life"]);

        assert_eq!(store.upsert_quote(&r, run_id).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(
            store.upsert_quote(&r, run_id).unwrap(),
            UpsertOutcome::AlreadyPresent
        );
        assert_eq!(store.count_quotes().unwrap(), 1);
    }

    #[test]
    fn test_collision_leaves_stored_tags_untouched() {
        let (mut store, run_id) = store_with_run();

        let first = record("to be", "Hamlet", &["life", "choice"]);
        store.upsert_quote(&first, run_id).unwrap();

        // Same key, different tags: same logical entity, no rewrite
        let second = record("to be", "Hamlet", &["other"]);
        assert_eq!(
            store.upsert_quote(&second, run_id).unwrap(),
            UpsertOutcome::AlreadyPresent
        );

        let stored = store.get_quote("to be", "Hamlet").unwrap().unwrap();
        assert_eq!(stored.tags, vec!["life", "choice"]);
    }

    #[test]
    fn test_tag_order_preserved() {
        let (mut store, run_id) = store_with_run();
        let r = record("q", "a", &["zebra", "apple", "mango"]);
        store.upsert_quote(&r, run_id).unwrap();

        let stored = store.get_quote("q", "a").unwrap().unwrap();
        assert_eq!(stored.tags, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_same_text_different_author_both_stored() {
        let (mut store, run_id) = store_with_run();
        store
            .upsert_quote(&record("less is more", "Mies", &[]), run_id)
            .unwrap();
        store
            .upsert_quote(&record("less is more", "Browning", &[]), run_id)
            .unwrap();

        assert_eq!(store.count_quotes().unwrap(), 2);
    }

    #[test]
    fn test_counts() {
        let (mut store, run_id) = store_with_run();
        store
            .upsert_quote(&record("q1", "a1", &["t1", "t2"]), run_id)
            .unwrap();
        store
            .upsert_quote(&record("q2", "a1", &["t2", "t3"]), run_id)
            .unwrap();

        assert_eq!(store.count_quotes().unwrap(), 2);
        assert_eq!(store.count_authors().unwrap(), 1);
        assert_eq!(store.count_tags().unwrap(), 3);
    }

    #[test]
    fn test_run_lifecycle() {
        let (mut store, run_id) = store_with_run();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        store
            .finish_run(run_id, RunStatus::Failed, Some("transport error"))
            .unwrap();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("transport error"));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_get_latest_run() {
        let (mut store, first) = store_with_run();
        let second = store.create_run("other-hash").unwrap();
        assert!(second > first);

        let latest = store.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, second);
    }

    #[test]
    fn test_get_run_not_found() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            store.get_run(42),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_list_quotes_in_insertion_order() {
        let (mut store, run_id) = store_with_run();
        store.upsert_quote(&record("q1", "a", &[]), run_id).unwrap();
        store.upsert_quote(&record("q2", "a", &[]), run_id).unwrap();

        let all = store.list_quotes().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].text, "q1");
        assert_eq!(all[1].text, "q2");
    }
}
