use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// Owned handle to the catalog. Each process (or thread) opens its own;
/// SQLite's locking keeps them consistent.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        debug!("Opened catalog at {}", path.as_ref().display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        // busy_timeout first so the WAL switch waits out other openers.
        self.conn.execute_batch(
            "PRAGMA busy_timeout = 5000;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 5s busy timeout)");
        Ok(())
    }

    /// Apply the schema. Every statement is `IF NOT EXISTS`, so records
    /// survive reopening; existing data is never dropped.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(include_str!("schema.sql"))?;
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
            debug!("Catalog schema upgraded from version {} to {}", version, SCHEMA_VERSION);
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
