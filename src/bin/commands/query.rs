use anyhow::Result;
use clap::Args;
use fieldstore::{OutputFormat, StoreConfig, Value};

use super::open_store;

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// SQL statement; use `?` for parameters
    #[clap(value_name = "SQL")]
    pub sql: String,

    /// Positional parameter value, repeatable; integers and reals are bound as numbers
    #[clap(long = "param", short = 'p')]
    pub params: Vec<String>,
}

fn parse_param(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Real(f);
    }
    Value::Text(raw.to_string())
}

pub async fn run(config: &StoreConfig, args: QueryArgs, output_format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let params: Vec<Value> = args.params.iter().map(|p| parse_param(p)).collect();

    let rows = store
        .select_with_params(&args.sql, &params, "cliQuery")
        .await?;

    if rows.is_empty() && !output_format.is_json() {
        println!("No rows");
        return Ok(());
    }
    println!("{}", output_format.render_rows(&rows));
    Ok(())
}
