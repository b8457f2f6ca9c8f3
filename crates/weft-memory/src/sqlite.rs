use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use futures::future::BoxFuture;
use rusqlite::{params, Connection};
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::HistoryStore;
use weft_core::types::{HistoryEntry, Session, SessionId};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    input TEXT NOT NULL,
    output TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    success INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_session ON runs(session_id, id);";

/// SQLite-backed history store. Keeps all entries; a durable store may.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WeftError::Storage(format!("Failed to create db directory: {}", e)))?;
        }

        let conn =
            Connection::open(path).map_err(|e| WeftError::Storage(e.to_string()))?;

        // WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| WeftError::Storage(e.to_string()))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| WeftError::Storage(e.to_string()))?;

        debug!(path = %path.display(), "SQLite history store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| WeftError::Storage(e.to_string()))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| WeftError::Storage(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get_session<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, Result<Session>> {
        let sid = id.0.clone();

        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Storage(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT input, output, timestamp, success FROM runs
                     WHERE session_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| WeftError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(params![sid], |row| {
                    let input: String = row.get(0)?;
                    let output: String = row.get(1)?;
                    let ts_str: String = row.get(2)?;
                    let success: bool = row.get(3)?;
                    Ok((input, output, ts_str, success))
                })
                .map_err(|e| WeftError::Storage(e.to_string()))?;

            let mut runs = Vec::new();
            for row in rows {
                let (input, output, ts_str, success) =
                    row.map_err(|e| WeftError::Storage(e.to_string()))?;

                let timestamp = chrono::DateTime::parse_from_rfc3339(&ts_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                runs.push(HistoryEntry {
                    input,
                    output,
                    timestamp,
                    success,
                });
            }

            Ok(Session {
                id: id.clone(),
                runs,
            })
        })
    }

    fn append_run<'a>(
        &'a self,
        id: &'a SessionId,
        entry: HistoryEntry,
    ) -> BoxFuture<'a, Result<()>> {
        let sid = id.0.clone();

        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Storage(e.to_string()))?;

            conn.execute(
                "INSERT INTO runs (session_id, input, output, timestamp, success)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sid,
                    entry.input,
                    entry.output,
                    entry.timestamp.to_rfc3339(),
                    entry.success,
                ],
            )
            .map_err(|e| WeftError::Storage(e.to_string()))?;

            Ok(())
        })
    }
}
