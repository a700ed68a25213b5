//! Core database infrastructure
//!
//! This module provides the foundational components every store is built on:
//! - `DatabaseConn`: the shared SQLite connection and its blocking-pool bridge
//! - `DatabaseConn::execute`: single-statement execution with result transforms
//! - `SchemaManager`: bookkeeping tables, caller tables and the version record
//! - `Value` / `Row`: dynamically typed parameters and result rows
//! - `StoreError`: the error envelope shared by every operation

mod connection;
mod error;
mod executor;
mod schema;
mod value;

pub use connection::{DatabaseConn, Location, StoreOptions};
pub use error::{Result, Stage, StoreError};
pub use executor::QueryOutcome;
pub use schema::{SchemaDefinitions, SchemaManager, DEFAULT_APP_VERSION};
pub use value::{Row, Value};
