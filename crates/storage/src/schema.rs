//! Database schema and configuration
//!
//! **SoC:** This module ONLY defines schema, no business logic

use rusqlite::Connection;
use std::path::Path;

/// Storage configuration (declarative)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to SQLite database (`:memory:` for in-memory)
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

/// Initialize database with schema
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS polls (
            id BLOB PRIMARY KEY,
            question TEXT NOT NULL,
            creator_ip TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Display order is `position`, fixed at creation
    conn.execute(
        "CREATE TABLE IF NOT EXISTS options (
            id BLOB PRIMARY KEY,
            poll_id BLOB NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            position INTEGER NOT NULL,
            UNIQUE(poll_id, position)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_options_poll ON options(poll_id)",
        [],
    )?;

    // One vote per (poll, fingerprint): duplicate detection lives here
    conn.execute(
        "CREATE TABLE IF NOT EXISTS votes (
            id BLOB PRIMARY KEY,
            poll_id BLOB NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
            option_id BLOB NOT NULL REFERENCES options(id) ON DELETE CASCADE,
            voter_fingerprint TEXT NOT NULL,
            voter_ip TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(poll_id, voter_fingerprint)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_votes_option ON votes(option_id)",
        [],
    )?;

    Ok(())
}
