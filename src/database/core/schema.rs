//! Database schema management
//!
//! Bookkeeping tables owned by the storage layer, plus the steps of
//! initialization that do not involve migrations: creating tables and
//! seeding the version record.

use tracing::info;

use crate::database::core::connection::DatabaseConn;
use crate::database::core::error::Result;
use crate::database::core::value::Value;

/// Version value recorded in `App_Version` when none is configured
pub const DEFAULT_APP_VERSION: i64 = 1;

/// Schema definitions for the bookkeeping tables
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Holds one integer: the count of alterations already considered
    pub const MIGRATIONS_TABLE: &'static str =
        "CREATE TABLE IF NOT EXISTS Migrations (Id INTEGER NOT NULL)";

    /// One row per application version that has run against this database
    pub const APP_VERSION_TABLE: &'static str =
        "CREATE TABLE IF NOT EXISTS App_Version (Version INTEGER NOT NULL)";

    pub const BOOKKEEPING: &'static [&'static str] =
        &[Self::MIGRATIONS_TABLE, Self::APP_VERSION_TABLE];

    /// Table names owned by the storage layer rather than the application
    pub const RESERVED_TABLES: &'static [&'static str] = &["Migrations", "App_Version"];
}

/// Schema manager for a store connection
///
/// Handles table creation and the version record.
pub struct SchemaManager<'a> {
    db: &'a DatabaseConn,
}

impl<'a> SchemaManager<'a> {
    pub fn new(db: &'a DatabaseConn) -> Self {
        Self { db }
    }

    /// Create the bookkeeping tables, then each caller table in order
    ///
    /// Stops at the first failing statement.
    pub async fn create_tables(&self, table_schemas: &[String]) -> Result<()> {
        for sql in SchemaDefinitions::BOOKKEEPING {
            self.db.execute_unit("createBookkeeping", sql, &[]).await?;
        }
        for sql in table_schemas {
            self.db.execute_unit("createTables", sql, &[]).await?;
        }
        Ok(())
    }

    /// Insert `version` into `App_Version` unless a row for it exists
    ///
    /// Returns whether a row was inserted.
    pub async fn seed_version(&self, version: i64) -> Result<bool> {
        let count = self
            .db
            .execute(
                "getAppVersion",
                "SELECT COUNT(*) AS count FROM App_Version WHERE Version = ?",
                &[Value::Integer(version)],
                |outcome| {
                    outcome
                        .rows
                        .first()
                        .and_then(|row| row.get("count"))
                        .and_then(Value::as_i64)
                        .ok_or("count query returned no rows")
                },
            )
            .await?;

        if count > 0 {
            return Ok(false);
        }

        self.db
            .execute_unit(
                "insertAppVersion",
                "INSERT INTO App_Version (Version) VALUES (?)",
                &[Value::Integer(version)],
            )
            .await?;
        info!("Recorded app version {}", version);
        Ok(true)
    }

    /// All recorded app versions, ascending
    pub async fn app_versions(&self) -> Result<Vec<i64>> {
        self.db
            .execute(
                "selectAppVersions",
                "SELECT Version FROM App_Version ORDER BY Version",
                &[],
                |outcome| {
                    Ok::<_, &str>(
                        outcome
                            .rows
                            .iter()
                            .filter_map(|row| row.get("Version").and_then(Value::as_i64))
                            .collect(),
                    )
                },
            )
            .await
    }

    /// Check if a table exists in the database
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        self.db
            .execute(
                "tableExists",
                "SELECT COUNT(*) AS c FROM sqlite_master WHERE type='table' AND name=?",
                &[table_name.into()],
                |outcome| {
                    outcome
                        .rows
                        .first()
                        .and_then(|row| row.get("c"))
                        .and_then(Value::as_i64)
                        .map(|c| c > 0)
                        .ok_or("existence query returned no rows")
                },
            )
            .await
    }

    /// Names of the application's tables, excluding bookkeeping and SQLite internals
    pub async fn user_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .db
            .execute(
                "listTables",
                "SELECT name FROM sqlite_master \
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
                |outcome| {
                    Ok::<_, &str>(
                        outcome
                            .rows
                            .iter()
                            .filter_map(|row| row.get("name").and_then(Value::as_str))
                            .map(String::from)
                            .collect(),
                    )
                },
            )
            .await?;
        Ok(names
            .into_iter()
            .filter(|n| !SchemaDefinitions::RESERVED_TABLES.contains(&n.as_str()))
            .collect())
    }

    /// Get the row count for a table
    pub async fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) AS c FROM \"{}\"", table_name.replace('"', "\"\""));
        self.db
            .execute("tableCount", &query, &[], |outcome| {
                outcome
                    .rows
                    .first()
                    .and_then(|row| row.get("c"))
                    .and_then(Value::as_i64)
                    .map(|c| c as u64)
                    .ok_or("count query returned no rows")
            })
            .await
    }
}
