//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the quotegrab database.

/// SQL schema for the database
///
/// The UNIQUE constraint over (text, author) is the dedup invariant:
/// the engine itself refuses a second row with the same pair.
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    error TEXT
);

-- Harvested quotes; identity is the (text, author) pair
CREATE TABLE IF NOT EXISTS quotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    author TEXT NOT NULL,
    inserted_at TEXT NOT NULL,
    first_seen_run INTEGER NOT NULL REFERENCES runs(id),
    UNIQUE(text, author)
);

CREATE INDEX IF NOT EXISTS idx_quotes_author ON quotes(author);

-- Tags per quote; position preserves document order
CREATE TABLE IF NOT EXISTS quote_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quote_id INTEGER NOT NULL REFERENCES quotes(id),
    position INTEGER NOT NULL,
    tag TEXT NOT NULL,
    UNIQUE(quote_id, position)
);

CREATE INDEX IF NOT EXISTS idx_quote_tags_quote ON quote_tags(quote_id);
CREATE INDEX IF NOT EXISTS idx_quote_tags_tag ON quote_tags(tag);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
