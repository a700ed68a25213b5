use anyhow::Result;
use clap::Args;
use fieldstore::{MigrationLog, MigrationPlan, OutputFormat, SchemaManifest, StoreConfig};
use serde::Serialize;

use super::open_store;

/// Arguments for the Init command
#[derive(Args)]
pub struct InitArgs {
    /// Schema manifest (TOML); defaults to `manifest` from the configuration
    #[clap(long, short)]
    pub manifest: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitSummary {
    database: String,
    plan: String,
    applied: Vec<u32>,
    skipped_blank: Vec<u32>,
    skipped_existing: Vec<u32>,
    migration_record: usize,
    app_version: i64,
}

fn describe(plan: &MigrationPlan) -> String {
    match plan {
        MigrationPlan::FirstRun { total } => format!("first run ({} alterations)", total),
        MigrationPlan::Incremental { from, to } => format!("incremental ({} -> {})", from, to),
        MigrationPlan::UpToDate { recorded } => format!("up to date ({})", recorded),
    }
}

pub async fn run(config: &StoreConfig, args: InitArgs, output_format: OutputFormat) -> Result<()> {
    let (tables, log) = match args.manifest.as_ref().or(config.manifest.as_ref()) {
        Some(path) => {
            let manifest = SchemaManifest::load(path)?;
            (manifest.tables, manifest.log)
        }
        None => (Vec::new(), MigrationLog::new()),
    };

    let store = open_store(config)?;
    let report = store.bootstrap(&tables, &log).await?;

    let summary = InitSummary {
        database: config.database_path(),
        plan: describe(&report.plan),
        applied: report.applied,
        skipped_blank: report.skipped_blank,
        skipped_existing: report.skipped_existing,
        migration_record: report.recorded,
        app_version: config.app_version,
    };

    if output_format.is_json() {
        println!("{}", output_format.render_value(&summary));
        return Ok(());
    }

    println!("Initialized {}", summary.database);
    println!("  tables:            {}", tables.len());
    println!("  migrations:        {}", summary.plan);
    println!("  applied:           {:?}", summary.applied);
    if !summary.skipped_blank.is_empty() {
        println!("  skipped (blank):   {:?}", summary.skipped_blank);
    }
    if !summary.skipped_existing.is_empty() {
        println!("  skipped (present): {:?}", summary.skipped_existing);
    }
    println!("  record:            {}", summary.migration_record);
    Ok(())
}
