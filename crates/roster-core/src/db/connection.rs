//! libSQL connection handle for the roster store

use std::path::Path;

use libsql::{Builder, Connection};

use super::migrations;
use crate::error::Result;

const MEMORY: &str = ":memory:";

/// Pragmas that may fail harmlessly (WAL is not available in memory)
const BEST_EFFORT_PRAGMAS: [&str; 2] = ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"];

/// An open, migrated roster database
pub struct Database {
    // Dropping the libsql handle would invalidate `conn`.
    _handle: libsql::Database,
    conn: Connection,
}

impl Database {
    /// Open or create the database file at `path` and bring its schema up to date
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let location = path.as_ref().to_string_lossy().into_owned();
        let database = Self::build(&location).await?;
        tracing::debug!(path = %location, "Opened roster database");
        Ok(database)
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::build(MEMORY).await
    }

    async fn build(location: &str) -> Result<Self> {
        let handle = Builder::new_local(location).build().await?;
        let conn = handle.connect()?;

        for pragma in BEST_EFFORT_PRAGMAS {
            if let Err(error) = conn.execute(pragma, ()).await {
                tracing::debug!(%error, "Skipped {pragma}");
            }
        }
        // people.department_id and people.manager_id are real references
        conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        migrations::run(&conn).await?;

        Ok(Self {
            _handle: handle,
            conn,
        })
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
