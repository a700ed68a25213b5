use anyhow::{anyhow, Context, Result};
use clap::Args;
use fieldstore::{OutputFormat, Row, StoreConfig, Value};
use itertools::Itertools;
use serde_json::json;
use std::path::PathBuf;

use super::open_store;

/// Arguments for the Import command
#[derive(Args)]
pub struct ImportArgs {
    /// Target table
    #[clap(value_name = "TABLE")]
    pub table: String,

    /// JSON file holding an array of objects; keys of the first object name the columns
    #[clap(value_name = "FILE")]
    pub file: PathBuf,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Rows in the column order of the first object; missing keys become NULL
fn to_rows(objects: &[serde_json::Map<String, serde_json::Value>]) -> (Vec<String>, Vec<Row>) {
    let columns: Vec<String> = objects
        .first()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|c| {
                    let value = object.get(c).map(Value::from).unwrap_or(Value::Null);
                    (c.clone(), value)
                })
                .collect::<Row>()
        })
        .collect();
    (columns, rows)
}

pub async fn run(
    config: &StoreConfig,
    args: ImportArgs,
    output_format: OutputFormat,
) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Unable to read {}", args.file.display()))?;
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of objects", args.file.display()))?;

    let (columns, rows) = to_rows(&objects);
    if columns.is_empty() && !rows.is_empty() {
        return Err(anyhow!("the first object has no keys"));
    }

    let store = open_store(config)?;
    let base = format!(
        "INSERT INTO {} ({})",
        quote_ident(&args.table),
        columns.iter().map(|c| quote_ident(c)).join(", ")
    );
    let placeholder = format!("({})", std::iter::repeat("?").take(columns.len()).join(", "));

    store
        .bulk_insert(&base, &rows, &placeholder, &format!("import {}", args.table))
        .await?;

    if output_format.is_json() {
        let summary = json!({"table": args.table, "rows": rows.len()});
        println!("{}", output_format.render_value(&summary));
    } else {
        println!("Imported {} rows into {}", rows.len(), args.table);
    }
    Ok(())
}
