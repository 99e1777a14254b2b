//! Database connection management.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Database wrapper for sleeptrack.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get the default database path (`<data dir>/sleeptrack/sleep.db`).
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Could not find data directory")?
            .join("sleeptrack");
        Ok(data_dir.join("sleep.db"))
    }

    /// Open or create the database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS daily_sleep_quality_table (
                night_id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                quality_rating INTEGER NOT NULL DEFAULT -1
            );
            ",
        )?;
        Ok(())
    }

    /// Get a reference to the connection.
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }
}
