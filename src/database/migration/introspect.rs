//! Column introspection for `ADD COLUMN` alterations
//!
//! Only the shape `ALTER TABLE <table> ADD COLUMN <column>` is recognized.
//! Anything else is reported as "column does not exist" so the alteration
//! is executed and the engine decides.

use regex::Regex;
use std::sync::LazyLock;

use crate::database::core::{DatabaseConn, Result, Value};

#[allow(clippy::expect_used)]
static ADD_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+[`"]?(\w+)[`"]?\s+ADD\s+COLUMN\s+[`"]?(\w+)[`"]?"#)
        .expect("static regex must compile")
});

/// Target of an `ADD COLUMN` alteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddColumn {
    pub table: String,
    pub column: String,
}

/// Extract the table and column from an `ADD COLUMN` statement
pub fn parse_add_column(statement: &str) -> Option<AddColumn> {
    let caps = ADD_COLUMN_RE.captures(statement)?;
    Some(AddColumn {
        table: caps.get(1)?.as_str().to_string(),
        column: caps.get(2)?.as_str().to_string(),
    })
}

/// Names of the columns the engine reports for `table`
pub async fn table_columns(db: &DatabaseConn, table: &str) -> Result<Vec<String>> {
    let query = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
    db.execute("pragmaTableInfo", &query, &[], |outcome| {
        Ok::<_, &str>(
            outcome
                .rows
                .iter()
                .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
                .collect(),
        )
    })
    .await
}

/// Whether the column an alteration would add is already present
///
/// Unparsable statements return `false`. The comparison against
/// engine-reported names is case-sensitive.
pub async fn column_exists(db: &DatabaseConn, statement: &str) -> Result<bool> {
    let Some(target) = parse_add_column(statement) else {
        return Ok(false);
    };
    let columns = table_columns(db, &target.table).await?;
    Ok(columns.iter().any(|name| *name == target.column))
}
