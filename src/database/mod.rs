//! Database module
//!
//! This module provides all database functionality for fieldstore, organized into:
//!
//! - **core**: Connection, statement execution, schema bookkeeping, error envelope
//! - **migration**: Append-only alteration log and its reconciliation
//! - **bulk**: Chunked multi-row inserts
//! - **store**: The `Store` handle applications hold
//! - **error_log**: Offline error reports kept in the `ErrorLog` table
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # Shared SQLite connection behind an async mutex
//! │   ├── executor    # One statement, one transaction, one transform
//! │   ├── schema      # Bookkeeping tables and the version record
//! │   ├── value       # Parameters and result rows
//! │   └── error       # StoreError and Stage
//! │
//! ├── migration/      # Migration tracker
//! │   └── introspect  # ADD COLUMN parsing and PRAGMA table_info
//! │
//! ├── bulk            # Bulk insert batcher
//! ├── store           # Store (initialize + CRUD surface)
//! └── error_log       # ErrorLog repository and ErrorSink
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use fieldstore::database::{Store, StoreOptions};
//!
//! let store = Store::initialize(
//!     &StoreOptions::in_dir("survey.db", "/var/lib/survey"),
//!     &["CREATE TABLE IF NOT EXISTS T (Id INTEGER PRIMARY KEY, Name TEXT)".to_string()],
//!     &["ALTER TABLE T ADD COLUMN Notes TEXT".to_string()],
//! )
//! .await?;
//!
//! let id = store
//!     .insert_returning_id("INSERT INTO T (Name) VALUES (?)", &["Alice".into()], "addName")
//!     .await?;
//! let rows = store.select("SELECT * FROM T", "listNames").await?;
//! ```

pub mod bulk;
pub mod core;
pub mod error_log;
pub mod migration;
pub mod store;

pub use bulk::{plan_chunks, ChunkStatement, MAX_CHUNK_ROWS};
pub use self::core::{
    DatabaseConn, Location, QueryOutcome, Result, Row, SchemaDefinitions, SchemaManager, Stage,
    StoreError, StoreOptions, Value, DEFAULT_APP_VERSION,
};
pub use error_log::{ErrorEntry, ErrorLogRepository, ErrorSink, CREATED_ON_FORMAT};
pub use migration::{
    column_exists, parse_add_column, plan, reconcile, AddColumn, Alteration, MigrationLog,
    MigrationPlan, MigrationReport,
};
pub use store::Store;
