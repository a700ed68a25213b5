//! Database connection management
//!
//! This module owns the single SQLite connection used by a store. The
//! connection sits behind an async mutex and every call runs on tokio's
//! blocking pool while holding it, so statements issued from concurrent
//! tasks never interleave on the handle.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::database::core::error::{Result, StoreError};

/// Where the database file lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    /// The platform data directory, e.g. `~/.local/share/fieldstore`
    #[default]
    Default,
    /// An explicit directory
    Directory(PathBuf),
    /// A private in-memory database (tests, dry runs)
    InMemory,
}

/// Fixed open configuration for a store: database name plus location class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub name: String,
    pub location: Location,
}

impl StoreOptions {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    /// In-memory database with the given name (name is used only for logging)
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, Location::InMemory)
    }

    /// Database file in an explicit directory
    pub fn in_dir(name: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        Self::new(name, Location::Directory(dir.as_ref().to_path_buf()))
    }

    /// Resolve the on-disk path, `None` for in-memory databases
    pub fn path(&self) -> Option<PathBuf> {
        match &self.location {
            Location::Default => {
                let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
                Some(base.join("fieldstore").join(&self.name))
            }
            Location::Directory(dir) => Some(dir.join(&self.name)),
            Location::InMemory => None,
        }
    }
}

/// Core database connection wrapper
///
/// `DatabaseConn` is cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct DatabaseConn {
    inner: Arc<Mutex<Connection>>,
    label: Arc<str>,
}

impl DatabaseConn {
    /// Open the database described by `options`
    ///
    /// Creates the parent directory for file databases. Any failure here is
    /// fatal to the caller.
    pub fn open(options: &StoreOptions) -> Result<Self> {
        let (conn, label) = match options.path() {
            Some(path) => {
                let label = path.to_string_lossy().to_string();
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                        path: parent.to_string_lossy().to_string(),
                        source: e,
                    })?;
                }
                let conn = Connection::open(&path).map_err(|e| StoreError::Open {
                    path: label.clone(),
                    source: e,
                })?;
                (conn, label)
            }
            None => {
                let label = format!(":memory:{}", options.name);
                let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
                    path: label.clone(),
                    source: e,
                })?;
                (conn, label)
            }
        };

        configure(&conn, options.location == Location::InMemory).map_err(|e| {
            StoreError::Open {
                path: label.clone(),
                source: e,
            }
        })?;

        info!("Opened database {}", label);

        Ok(DatabaseConn {
            inner: Arc::new(Mutex::new(conn)),
            label: label.into(),
        })
    }

    /// Path (or in-memory label) this connection was opened with
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run `f` against the connection on the blocking pool
    ///
    /// The lock is acquired asynchronously and held until `f` returns.
    pub(crate) async fn call<F, R>(&self, operation: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.inner.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut guard))
            .await
            .map_err(|e| StoreError::execution_message(operation, e.to_string()))?
    }
}

/// Apply connection pragmas
fn configure(conn: &Connection, in_memory: bool) -> rusqlite::Result<()> {
    if !in_memory {
        // journal_mode returns the resulting mode as a row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    }
    conn.execute_batch(
        "PRAGMA synchronous=NORMAL;
         PRAGMA temp_store=MEMORY;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_path() {
        let opts = StoreOptions::in_dir("survey.db", "/tmp/fieldstore-test");
        assert_eq!(
            opts.path(),
            Some(PathBuf::from("/tmp/fieldstore-test/survey.db"))
        );
        assert_eq!(StoreOptions::in_memory("survey.db").path(), None);
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = DatabaseConn::open(&StoreOptions::in_memory("test"));
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let db = DatabaseConn::open(&StoreOptions::in_dir("nested.db", &nested)).unwrap();
        assert!(nested.join("nested.db").exists());
        assert!(db.label().ends_with("nested.db"));
    }

    #[tokio::test]
    async fn test_call_runs_on_connection() {
        let db = DatabaseConn::open(&StoreOptions::in_memory("test")).unwrap();
        let value: i64 = db
            .call("selectAnswer", |conn| {
                conn.query_row("SELECT 41 + 1", [], |row| row.get(0))
                    .map_err(|e| StoreError::execution("selectAnswer", &e))
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_open_fails_on_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the database file should be
        std::fs::create_dir(dir.path().join("taken.db")).unwrap();
        let result = DatabaseConn::open(&StoreOptions::in_dir("taken.db", dir.path()));
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }
}
