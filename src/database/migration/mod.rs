//! Append-only schema migrations
//!
//! Alterations are kept in a [`MigrationLog`]. Each entry has a stable
//! 1-based id equal to its position, and the log can only grow. The
//! `Migrations` table stores how many entries have been considered, so a
//! later run only looks at the entries appended since.
//!
//! Reconciliation follows one of three branches, picked by [`plan`]:
//!
//! - first run (no record): consider every entry, then insert the count
//! - incremental (record below the log length): consider the new entries,
//!   then update the record
//! - up to date: do nothing
//!
//! An entry is skipped without execution when it is blank or when the
//! column it adds already exists; skipped entries still count.

mod introspect;

pub use introspect::{column_exists, parse_add_column, table_columns, AddColumn};

use serde::Deserialize;
use std::ops::Range;
use tracing::info;

use crate::database::core::{DatabaseConn, Result, StoreError, Value};

/// One alteration statement with its stable id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Alteration {
    pub id: u32,
    pub sql: String,
}

/// Ordered, append-only list of alterations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationLog {
    entries: Vec<Alteration>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from bare statements; ids follow their order
    pub fn from_statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut log = Self::new();
        for sql in statements {
            log.append(sql);
        }
        log
    }

    /// Build a log from explicitly numbered entries
    ///
    /// Ids must be exactly `1..=N` in order. A gap, duplicate, or reordering
    /// means an entry was removed or moved, which would shift every later
    /// entry onto the wrong recorded count.
    pub fn from_entries(entries: Vec<Alteration>) -> Result<Self> {
        for (idx, entry) in entries.iter().enumerate() {
            let expected = idx as u32 + 1;
            if entry.id != expected {
                return Err(StoreError::MigrationLog(format!(
                    "entry #{} has id {}, expected {}",
                    idx + 1,
                    entry.id,
                    expected
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Append a statement and return its id
    pub fn append(&mut self, sql: impl Into<String>) -> u32 {
        let id = self.entries.len() as u32 + 1;
        self.entries.push(Alteration {
            id,
            sql: sql.into(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Alteration] {
        &self.entries
    }

    /// Entries whose positions fall in `range`
    pub fn pending(&self, range: Range<usize>) -> &[Alteration] {
        let end = range.end.min(self.entries.len());
        let start = range.start.min(end);
        &self.entries[start..end]
    }
}

/// Which reconciliation branch applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPlan {
    /// No record yet: consider `[0, total)` and insert `total`
    FirstRun { total: usize },
    /// Record `from` is behind: consider `[from, to)` and update to `to`
    Incremental { from: usize, to: usize },
    /// Record already covers the whole log
    UpToDate { recorded: usize },
}

impl MigrationPlan {
    /// Positions of the entries this plan considers
    pub fn pending_range(&self) -> Range<usize> {
        match *self {
            MigrationPlan::FirstRun { total } => 0..total,
            MigrationPlan::Incremental { from, to } => from..to,
            MigrationPlan::UpToDate { .. } => 0..0,
        }
    }
}

/// Pick the branch for a recorded count and a log length
pub fn plan(recorded: Option<i64>, total: usize) -> MigrationPlan {
    match recorded {
        None => MigrationPlan::FirstRun { total },
        Some(max) if max < 0 => MigrationPlan::Incremental { from: 0, to: total },
        Some(max) if (max as usize) < total => MigrationPlan::Incremental {
            from: max as usize,
            to: total,
        },
        Some(max) => MigrationPlan::UpToDate {
            recorded: max as usize,
        },
    }
}

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub plan: MigrationPlan,
    /// Ids of the alterations that were executed
    pub applied: Vec<u32>,
    /// Ids skipped because the statement was blank
    pub skipped_blank: Vec<u32>,
    /// Ids skipped because the column already existed
    pub skipped_existing: Vec<u32>,
    /// Count stored in `Migrations` after the run
    pub recorded: usize,
}

/// Read the recorded count, `None` when no record exists
pub async fn recorded_count(db: &DatabaseConn) -> Result<Option<i64>> {
    db.execute(
        "selectMaxFromMigrations",
        "SELECT MAX(Id) AS Max FROM Migrations",
        &[],
        |outcome| {
            outcome
                .rows
                .first()
                .map(|row| row.get("Max").and_then(Value::as_i64))
                .ok_or("MAX query returned no rows")
        },
    )
    .await
}

/// Bring the database up to date with `log`
///
/// The record is only written after every pending entry succeeded. On
/// failure the record is untouched; entries already applied in the failed
/// run are skipped next time by introspection.
pub async fn reconcile(db: &DatabaseConn, log: &MigrationLog) -> Result<MigrationReport> {
    let recorded = recorded_count(db).await?;
    let plan = plan(recorded, log.len());
    info!("Migration plan: {:?}", plan);

    let mut report = MigrationReport {
        plan,
        applied: Vec::new(),
        skipped_blank: Vec::new(),
        skipped_existing: Vec::new(),
        recorded: match plan {
            MigrationPlan::UpToDate { recorded } => recorded,
            _ => log.len(),
        },
    };

    if let MigrationPlan::UpToDate { .. } = plan {
        return Ok(report);
    }

    for entry in log.pending(plan.pending_range()) {
        if entry.sql.trim().is_empty() {
            report.skipped_blank.push(entry.id);
            continue;
        }
        if column_exists(db, &entry.sql).await? {
            report.skipped_existing.push(entry.id);
            continue;
        }
        db.execute_unit("alterTable", &entry.sql, &[]).await?;
        report.applied.push(entry.id);
    }

    let total = Value::Integer(log.len() as i64);
    match plan {
        MigrationPlan::FirstRun { .. } => {
            db.execute_unit(
                "insertIntoMigrations",
                "INSERT INTO Migrations (Id) VALUES (?)",
                &[total],
            )
            .await?;
        }
        MigrationPlan::Incremental { from, .. } => {
            // a negative record is rewritten from its stored value
            let old = recorded.unwrap_or(from as i64);
            db.execute_unit(
                "updateMigrations",
                "UPDATE Migrations SET Id = ? WHERE Id = ?",
                &[total, Value::Integer(old)],
            )
            .await?;
        }
        MigrationPlan::UpToDate { .. } => {}
    }

    info!(
        "Migrations reconciled: {} applied, {} blank, {} already present, record = {}",
        report.applied.len(),
        report.skipped_blank.len(),
        report.skipped_existing.len(),
        report.recorded
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{SchemaManager, StoreOptions};

    async fn setup_db() -> DatabaseConn {
        let db = DatabaseConn::open(&StoreOptions::in_memory("migration")).unwrap();
        SchemaManager::new(&db)
            .create_tables(&["CREATE TABLE T (Id INTEGER)".to_string()])
            .await
            .unwrap();
        db
    }

    #[test]
    fn test_plan_branches() {
        assert_eq!(plan(None, 3), MigrationPlan::FirstRun { total: 3 });
        assert_eq!(plan(Some(1), 3), MigrationPlan::Incremental { from: 1, to: 3 });
        assert_eq!(plan(Some(3), 3), MigrationPlan::UpToDate { recorded: 3 });
        assert_eq!(plan(Some(5), 3), MigrationPlan::UpToDate { recorded: 5 });
        assert_eq!(plan(None, 0), MigrationPlan::FirstRun { total: 0 });
    }

    #[test]
    fn test_pending_range() {
        let log = MigrationLog::from_statements(["a", "b", "c"]);
        let ids: Vec<u32> = log
            .pending(MigrationPlan::Incremental { from: 1, to: 3 }.pending_range())
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(log.pending(5..9).is_empty());
    }

    #[test]
    fn test_log_append_assigns_ids() {
        let mut log = MigrationLog::new();
        assert_eq!(log.append("ALTER TABLE T ADD COLUMN A TEXT"), 1);
        assert_eq!(log.append("ALTER TABLE T ADD COLUMN B TEXT"), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_from_entries_rejects_gaps_and_reordering() {
        let ok = MigrationLog::from_entries(vec![
            Alteration { id: 1, sql: "a".into() },
            Alteration { id: 2, sql: "b".into() },
        ]);
        assert!(ok.is_ok());

        let gap = MigrationLog::from_entries(vec![
            Alteration { id: 1, sql: "a".into() },
            Alteration { id: 3, sql: "c".into() },
        ]);
        assert!(matches!(gap, Err(StoreError::MigrationLog(_))));

        let swapped = MigrationLog::from_entries(vec![
            Alteration { id: 2, sql: "b".into() },
            Alteration { id: 1, sql: "a".into() },
        ]);
        assert!(swapped.is_err());
    }

    #[tokio::test]
    async fn test_first_run_records_total() {
        let db = setup_db().await;
        let log = MigrationLog::from_statements([
            "ALTER TABLE T ADD COLUMN Name TEXT",
            "   ",
            "ALTER TABLE T ADD COLUMN Age INTEGER",
        ]);
        let report = reconcile(&db, &log).await.unwrap();

        assert_eq!(report.plan, MigrationPlan::FirstRun { total: 3 });
        assert_eq!(report.applied, vec![1, 3]);
        assert_eq!(report.skipped_blank, vec![2]);
        assert_eq!(recorded_count(&db).await.unwrap(), Some(3));
        assert_eq!(table_columns(&db, "T").await.unwrap(), vec!["Id", "Name", "Age"]);
    }

    #[tokio::test]
    async fn test_existing_column_is_skipped_but_counted() {
        let db = setup_db().await;
        db.execute_unit("manual", "ALTER TABLE T ADD COLUMN Name TEXT", &[])
            .await
            .unwrap();
        let log = MigrationLog::from_statements(["ALTER TABLE T ADD COLUMN Name TEXT"]);
        let report = reconcile(&db, &log).await.unwrap();

        assert!(report.applied.is_empty());
        assert_eq!(report.skipped_existing, vec![1]);
        assert_eq!(recorded_count(&db).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_incremental_only_considers_new_entries() {
        let db = setup_db().await;
        let mut log = MigrationLog::from_statements(["ALTER TABLE T ADD COLUMN Name TEXT"]);
        reconcile(&db, &log).await.unwrap();

        // dropping the column by hand is not noticed: entry 1 is never reconsidered
        log.append("ALTER TABLE T ADD COLUMN Age INTEGER");
        let report = reconcile(&db, &log).await.unwrap();

        assert_eq!(report.plan, MigrationPlan::Incremental { from: 1, to: 2 });
        assert_eq!(report.applied, vec![2]);
        assert_eq!(recorded_count(&db).await.unwrap(), Some(2));

        let count = db
            .execute("rows", "SELECT COUNT(*) AS c FROM Migrations", &[], |o| {
                o.rows[0].get("c").and_then(Value::as_i64).ok_or("no count")
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unparsable_alterations_are_applied_and_counted() {
        let db = setup_db().await;
        let log = MigrationLog::from_statements([
            "CREATE INDEX ix_t_id ON T(Id)",
            "ALTER TABLE T ADD Name TEXT",
        ]);
        let report = reconcile(&db, &log).await.unwrap();

        assert_eq!(report.applied, vec![1, 2]);
        assert!(report.skipped_existing.is_empty());
        assert_eq!(recorded_count(&db).await.unwrap(), Some(2));
        assert_eq!(table_columns(&db, "T").await.unwrap(), vec!["Id", "Name"]);

        let indexes = db
            .execute(
                "listIndexes",
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'ix_t_id'",
                &[],
                |o| Ok::<_, String>(o.rows),
            )
            .await
            .unwrap();
        assert_eq!(indexes.len(), 1);
    }

    #[tokio::test]
    async fn test_up_to_date_is_noop() {
        let db = setup_db().await;
        let log = MigrationLog::from_statements(["ALTER TABLE T ADD COLUMN Name TEXT"]);
        reconcile(&db, &log).await.unwrap();
        let report = reconcile(&db, &log).await.unwrap();

        assert_eq!(report.plan, MigrationPlan::UpToDate { recorded: 1 });
        assert!(report.applied.is_empty());
        assert!(report.skipped_existing.is_empty());
    }

    #[tokio::test]
    async fn test_failure_leaves_record_untouched() {
        let db = setup_db().await;
        let log = MigrationLog::from_statements([
            "ALTER TABLE T ADD COLUMN Name TEXT",
            "ALTER TABLE Missing ADD COLUMN X TEXT",
        ]);
        let err = reconcile(&db, &log).await.unwrap_err();
        assert_eq!(err.operation(), Some("alterTable"));
        assert_eq!(recorded_count(&db).await.unwrap(), None);

        // the retry skips the column added before the failure
        let fixed = MigrationLog::from_statements([
            "ALTER TABLE T ADD COLUMN Name TEXT",
            "ALTER TABLE T ADD COLUMN X TEXT",
        ]);
        let report = reconcile(&db, &fixed).await.unwrap();
        assert_eq!(report.skipped_existing, vec![1]);
        assert_eq!(report.applied, vec![2]);
    }
}
