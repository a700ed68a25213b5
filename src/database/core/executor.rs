//! Single-statement execution
//!
//! Every operation of the store goes through [`DatabaseConn::execute`]: one
//! statement, its parameters, and a transform shaping the raw
//! [`QueryOutcome`] into the caller's type. The statement runs inside its own
//! transaction; failures come back as [`StoreError::Query`] tagged with the
//! stage that failed.

use regex::Regex;
use rusqlite::{params_from_iter, Connection};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::database::core::connection::DatabaseConn;
use crate::database::core::error::{Result, StoreError};
use crate::database::core::value::{Row, Value};

/// Raw result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Rows produced by the statement, empty for writes
    pub rows: Vec<Row>,
    /// Row id assigned by an insert, if the statement inserted a row
    pub insert_id: Option<i64>,
    /// Rows changed by a write statement
    pub rows_affected: usize,
}

impl DatabaseConn {
    /// Run one statement in its own transaction and shape the result
    ///
    /// `operation` names the caller for error messages only. The transaction
    /// is committed before `transform` runs, so a transform failure does not
    /// undo the write. Only the first statement of `statement` is run; any
    /// text after its terminating `;` is ignored.
    pub async fn execute<T, E, F>(
        &self,
        operation: &str,
        statement: &str,
        params: &[Value],
        transform: F,
    ) -> Result<T>
    where
        F: FnOnce(QueryOutcome) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        debug!("{}: {}", operation, statement);

        let op = operation.to_string();
        let sql = statement.to_string();
        let params = params.to_vec();
        let raw = self
            .call(operation, move |conn| {
                run_in_transaction(conn, &sql, &params).map_err(|e| StoreError::execution(&op, &e))
            })
            .await;

        let outcome = match raw {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        transform(outcome).map_err(|e| {
            let err = StoreError::transform(operation, e);
            warn!("{}", err);
            err
        })
    }

    /// Run one statement and discard its result
    pub async fn execute_unit(
        &self,
        operation: &str,
        statement: &str,
        params: &[Value],
    ) -> Result<()> {
        self.execute(operation, statement, params, |_| {
            Ok::<_, std::convert::Infallible>(())
        })
        .await
    }
}

fn run_in_transaction(
    conn: &mut Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<QueryOutcome> {
    let tx = conn.transaction()?;
    let outcome = run_statement(&tx, sql, params)?;
    tx.commit()?;
    Ok(outcome)
}

#[allow(clippy::expect_used)]
static LEADING_COMMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?s)(?:\s+|--[^\n]*(?:\n|$)|/\*.*?\*/)*").expect("static regex must compile")
});

#[allow(clippy::expect_used)]
static DML_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(INSERT|REPLACE|UPDATE|DELETE)\b").expect("static regex must compile")
});

/// Whether the statement is an `INSERT` or `REPLACE`
///
/// Leading comments are skipped. For `WITH ...` the first DML keyword
/// decides, since a common table expression cannot contain one.
fn is_insert(sql: &str) -> bool {
    let start = LEADING_COMMENTS_RE.find(sql).map_or(0, |m| m.end());
    let head = &sql[start..];
    let starts_with = |kw: &str| head.get(..kw.len()).is_some_and(|h| h.eq_ignore_ascii_case(kw));

    if starts_with("WITH") {
        return DML_KEYWORD_RE.captures(head).is_some_and(|caps| {
            let kw = &caps[1];
            kw.eq_ignore_ascii_case("INSERT") || kw.eq_ignore_ascii_case("REPLACE")
        });
    }
    starts_with("INSERT") || starts_with("REPLACE")
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<QueryOutcome> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() > 0 {
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut rows = Vec::new();
        let mut cursor = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut out = Row::new();
            for (idx, name) in names.iter().enumerate() {
                out.set(name, row.get::<_, Value>(idx)?);
            }
            rows.push(out);
        }
        return Ok(QueryOutcome {
            rows,
            ..Default::default()
        });
    }

    let rows_affected = stmt.execute(params_from_iter(params.iter()))?;
    let insert_id = (rows_affected > 0 && is_insert(sql)).then(|| conn.last_insert_rowid());

    Ok(QueryOutcome {
        rows: Vec::new(),
        insert_id,
        rows_affected,
    })
}
