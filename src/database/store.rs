//! Store handle
//!
//! [`Store`] is the entry point for applications: it opens the database,
//! runs the bootstrap sequence (tables, migrations, version record), and
//! exposes the CRUD surface. Every operation takes an operation name that is
//! carried into errors.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::database::bulk;
use crate::database::core::{
    DatabaseConn, Result, Row, SchemaManager, StoreOptions, Value, DEFAULT_APP_VERSION,
};
use crate::database::migration::{self, MigrationLog, MigrationReport};

/// Shared handle to an initialized database
///
/// Clones share the connection and the init lock.
#[derive(Clone)]
pub struct Store {
    db: DatabaseConn,
    init_lock: Arc<Mutex<()>>,
    app_version: i64,
}

impl Store {
    /// Open a store without bootstrapping it
    pub fn open(options: &StoreOptions) -> Result<Self> {
        Ok(Store {
            db: DatabaseConn::open(options)?,
            init_lock: Arc::new(Mutex::new(())),
            app_version: DEFAULT_APP_VERSION,
        })
    }

    /// Version recorded in `App_Version` by [`Store::bootstrap`]
    pub fn with_app_version(mut self, version: i64) -> Self {
        self.app_version = version;
        self
    }

    /// Open and bootstrap a store
    ///
    /// `alterations` are bare statements; their ids follow their order.
    pub async fn initialize(
        options: &StoreOptions,
        table_schemas: &[String],
        alterations: &[String],
    ) -> Result<Self> {
        let store = Self::open(options)?;
        let log = MigrationLog::from_statements(alterations.iter().cloned());
        store.bootstrap(table_schemas, &log).await?;
        Ok(store)
    }

    /// Create tables, reconcile migrations, and seed the version record
    ///
    /// Steps run strictly in that order and the first failure aborts. Calls
    /// on clones of one store serialize.
    pub async fn bootstrap(
        &self,
        table_schemas: &[String],
        log: &MigrationLog,
    ) -> Result<MigrationReport> {
        let _guard = self.init_lock.lock().await;
        let schema = SchemaManager::new(&self.db);

        schema.create_tables(table_schemas).await?;
        let report = migration::reconcile(&self.db, log).await?;
        schema.seed_version(self.app_version).await?;

        info!("Store {} initialized", self.db.label());
        Ok(report)
    }

    /// The underlying connection
    pub fn conn(&self) -> &DatabaseConn {
        &self.db
    }

    pub async fn select_with_params(
        &self,
        query: &str,
        params: &[Value],
        operation: &str,
    ) -> Result<Vec<Row>> {
        self.db
            .execute(operation, query, params, |outcome| {
                Ok::<_, std::convert::Infallible>(outcome.rows)
            })
            .await
    }

    pub async fn select(&self, query: &str, operation: &str) -> Result<Vec<Row>> {
        self.select_with_params(query, &[], operation).await
    }

    /// Run an insert and return the id of the inserted row
    ///
    /// A statement that inserts nothing (e.g. `INSERT OR IGNORE` hitting a
    /// conflict) fails at the transform stage.
    pub async fn insert_returning_id(
        &self,
        query: &str,
        params: &[Value],
        operation: &str,
    ) -> Result<i64> {
        self.db
            .execute(operation, query, params, |outcome| {
                outcome.insert_id.ok_or("statement did not insert a row")
            })
            .await
    }

    pub async fn insert(&self, query: &str, params: &[Value], operation: &str) -> Result<()> {
        self.db.execute_unit(operation, query, params).await
    }

    pub async fn update(&self, query: &str, params: &[Value], operation: &str) -> Result<()> {
        self.db.execute_unit(operation, query, params).await
    }

    pub async fn delete(&self, query: &str, params: &[Value], operation: &str) -> Result<()> {
        self.db.execute_unit(operation, query, params).await
    }

    /// See [`bulk::bulk_insert`]
    pub async fn bulk_insert(
        &self,
        base_query: &str,
        rows: &[Row],
        placeholder: &str,
        operation: &str,
    ) -> Result<()> {
        bulk::bulk_insert(&self.db, base_query, rows, placeholder, operation).await
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        SchemaManager::new(&self.db).table_exists(table).await
    }

    pub async fn count_rows(&self, table: &str) -> Result<u64> {
        SchemaManager::new(&self.db).table_count(table).await
    }

    pub async fn user_tables(&self) -> Result<Vec<String>> {
        SchemaManager::new(&self.db).user_tables().await
    }

    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        migration::table_columns(&self.db, table).await
    }

    /// Recorded migration count, `None` before the first bootstrap
    pub async fn migration_count(&self) -> Result<Option<i64>> {
        migration::recorded_count(&self.db).await
    }

    pub async fn app_versions(&self) -> Result<Vec<i64>> {
        SchemaManager::new(&self.db).app_versions().await
    }
}
