use clap::{Parser, Subcommand};
use fieldstore::{OutputFormat, StoreConfig};
use tracing::Level;

mod commands;

use commands::import::ImportArgs;
use commands::init::InitArgs;
use commands::query::QueryArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.fieldstore/fieldstore.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables, apply pending alterations and record the app version
    Init(InitArgs),

    /// Show migration record, app versions and table row counts
    Status,

    /// Run a SELECT statement and print the rows
    Query(QueryArgs),

    /// Bulk-insert a JSON array of objects into a table
    Import(ImportArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match StoreConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::run(&config, args, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
        Commands::Query(args) => commands::query::run(&config, args, cli.format).await,
        Commands::Import(args) => commands::import::run(&config, args, cli.format).await,
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
