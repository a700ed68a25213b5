#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Fieldstore - embedded SQLite storage for offline-first data collection
//!
//! Fieldstore owns one SQLite database per application. It creates the
//! application's tables, keeps them in step with an append-only list of
//! schema alterations, records which application versions have run against
//! the file, and exposes async CRUD operations whose failures say which
//! operation failed and at which stage.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Store, migrations, bulk insert, error log | `rusqlite`, `tokio` |
//! | `display` | Table rendering of query results | `tabled` |
//! | `cli` | The `fieldstore` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! fieldstore = { version = "0.1", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: connection, execution, migrations, bulk insert, `Store`
//! - **[`config`]**: configuration file and environment layering
//! - **[`manifest`]**: schema manifest files for the CLI
//! - **[`output`]**: rendering rows as tables or JSON
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fieldstore::{Store, StoreOptions};
//!
//! let store = Store::initialize(
//!     &StoreOptions::in_memory("survey"),
//!     &["CREATE TABLE T (Id INTEGER)".to_string()],
//!     &["ALTER TABLE T ADD COLUMN Name TEXT".to_string()],
//! )
//! .await?;
//!
//! let id = store
//!     .insert_returning_id("INSERT INTO T (Name) VALUES (?)", &["Alice".into()], "addName")
//!     .await?;
//! let rows = store.select("SELECT Name FROM T", "listNames").await?;
//! assert_eq!(rows[0].get("Name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

pub mod config;
pub mod database;
pub mod manifest;
pub mod output;

pub use config::StoreConfig;
pub use manifest::SchemaManifest;
pub use output::OutputFormat;

pub use database::{
    DatabaseConn, ErrorEntry, ErrorLogRepository, ErrorSink, Location, MigrationLog,
    MigrationPlan, MigrationReport, Row, Stage, Store, StoreError, StoreOptions, Value,
};
