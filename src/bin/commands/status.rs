use anyhow::Result;
use fieldstore::{OutputFormat, Row, StoreConfig};
use serde::Serialize;

use super::open_store;

#[derive(Debug, Serialize)]
struct StoreStatus {
    database: String,
    migration_record: Option<i64>,
    app_versions: Vec<i64>,
    tables: Vec<Row>,
}

pub async fn run(config: &StoreConfig, output_format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;

    let initialized = store.table_exists("Migrations").await?;
    let (migration_record, app_versions) = if initialized {
        (store.migration_count().await?, store.app_versions().await?)
    } else {
        (None, Vec::new())
    };

    let mut tables = Vec::new();
    for name in store.user_tables().await? {
        let rows = store.count_rows(&name).await?;
        tables.push(Row::new().with("table", name).with("rows", rows as i64));
    }

    let status = StoreStatus {
        database: config.database_path(),
        migration_record,
        app_versions,
        tables,
    };

    if output_format.is_json() {
        println!("{}", output_format.render_value(&status));
        return Ok(());
    }

    println!("Database:         {}", status.database);
    if !initialized {
        println!("Not initialized; run `fieldstore init`");
        return Ok(());
    }
    match status.migration_record {
        Some(n) => println!("Migration record: {}", n),
        None => println!("Migration record: none"),
    }
    println!("App versions:     {:?}", status.app_versions);
    if status.tables.is_empty() {
        println!("No application tables");
    } else {
        println!("{}", output_format.render_rows(&status.tables));
    }
    Ok(())
}
