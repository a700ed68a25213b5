//! Chunked multi-row inserts
//!
//! A large row set is split into chunks of at most [`MAX_CHUNK_ROWS`] rows,
//! each issued as one multi-row `INSERT`. The limit keeps the bound
//! parameter count of a chunk within the engine's host parameter limit for
//! narrow tables.

use futures::future::try_join_all;
use itertools::Itertools;
use tracing::info;

use crate::database::core::{DatabaseConn, Result, Row, Value};

/// Maximum rows per chunk
pub const MAX_CHUNK_ROWS: usize = 999;

/// One chunk of a bulk insert, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkStatement {
    pub statement: String,
    pub params: Vec<Value>,
    pub rows: usize,
}

/// Build the chunk statements for `rows`
///
/// `placeholder_group` is the per-row group, e.g. `"(?, ?)"`. Parameters are
/// taken from each row in its column order; column names are not checked
/// against the base statement.
pub fn plan_chunks(
    base_statement: &str,
    rows: &[Row],
    placeholder_group: &str,
) -> Vec<ChunkStatement> {
    let prefix = values_prefix(base_statement);
    rows.chunks(MAX_CHUNK_ROWS)
        .map(|chunk| {
            let groups = std::iter::repeat(placeholder_group).take(chunk.len()).join(", ");
            ChunkStatement {
                statement: format!("{prefix}{groups}"),
                params: chunk.iter().flat_map(|row| row.values().cloned()).collect(),
                rows: chunk.len(),
            }
        })
        .collect()
}

/// Whether `statement` ends with the `VALUES` keyword as a whole word
fn ends_with_values_keyword(statement: &str) -> bool {
    let Some(split) = statement.len().checked_sub(6) else {
        return false;
    };
    if !statement.is_char_boundary(split) || !statement[split..].eq_ignore_ascii_case("VALUES") {
        return false;
    }
    statement[..split]
        .chars()
        .next_back()
        .map_or(true, |c| c.is_whitespace() || c == ')')
}

/// Base statement with a trailing `VALUES ` clause
fn values_prefix(base_statement: &str) -> String {
    let trimmed = base_statement.trim_end();
    if ends_with_values_keyword(trimmed) {
        format!("{trimmed} ")
    } else {
        format!("{trimmed} VALUES ")
    }
}

/// Insert `rows` in chunks, all issued concurrently
///
/// Chunks commit independently, so a failure can leave earlier chunks
/// applied. Resolves immediately when `rows` is empty.
pub async fn bulk_insert(
    db: &DatabaseConn,
    base_statement: &str,
    rows: &[Row],
    placeholder_group: &str,
    operation: &str,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let chunks = plan_chunks(base_statement, rows, placeholder_group);
    let chunk_op = format!("insert_chunk->{operation}");
    info!(
        "{}: inserting {} rows in {} chunks",
        operation,
        rows.len(),
        chunks.len()
    );

    try_join_all(
        chunks
            .iter()
            .map(|chunk| db.execute_unit(&chunk_op, &chunk.statement, &chunk.params)),
    )
    .await?;
    Ok(())
}
