use anyhow::{anyhow, Context, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::database::{StoreOptions, DEFAULT_APP_VERSION};

/// Settings for opening and bootstrapping a store from the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    /// Directory holding the database file
    pub data_dir: String,

    /// File name of the database inside `data_dir`
    pub database_name: String,

    /// Version recorded in `App_Version` on initialization
    pub app_version: i64,

    /// Default schema manifest for `fieldstore init`
    pub manifest: Option<String>,
}

const DEFAULT_DATABASE_NAME: &str = "fieldstore.sqlite3";

const EMPTY_CONFIG: &str = r#"### fieldstore configuration file

### directory holding the database file
# data_dir = "~/.fieldstore"

### database file name inside data_dir
# database_name = "fieldstore.sqlite3"

### version recorded in App_Version on init
# app_version = 1

### schema manifest used by `fieldstore init`
# manifest = "~/.fieldstore/schema.toml"
"#;

fn home_dir() -> Result<String> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("Could not convert home directory path to string"))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> Result<String> {
    match path.strip_prefix('~') {
        Some(rest) => Ok(format!("{}{}", home_dir()?, rest)),
        None => Ok(path.to_string()),
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.fieldstore", home),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION,
            manifest: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from file and environment
    ///
    /// Without `path`, `$HOME/.fieldstore/fieldstore.toml` is used and created
    /// from a commented template when missing. Variables prefixed with
    /// `FIELDSTORE_` override the file; a `.env` file is read first.
    pub fn new(path: &Option<String>) -> Result<StoreConfig> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => {
                let dir = format!("{}/.fieldstore", home_dir()?);
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Unable to create config directory {}", dir))?;
                PathBuf::from(format!("{}/fieldstore.toml", dir))
            }
        };

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow!("Could not convert path to string"))?;
            builder = builder.add_source(config::File::with_name(path_str));
        } else {
            std::fs::write(&config_path, EMPTY_CONFIG).with_context(|| {
                format!("Unable to create config file {}", config_path.display())
            })?;
        }

        // e.g. `FIELDSTORE_DATA_DIR=/tmp/fs fieldstore status`
        builder = builder.add_source(config::Environment::with_prefix("FIELDSTORE"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_values(&values)
    }

    /// Build a configuration from flat key/value settings, applying defaults
    pub fn from_values(values: &HashMap<String, String>) -> Result<StoreConfig> {
        let defaults = StoreConfig::default();

        let data_dir = match values.get("data_dir") {
            Some(dir) => expand_home(dir)?,
            None => defaults.data_dir,
        };

        let database_name = values
            .get("database_name")
            .cloned()
            .unwrap_or(defaults.database_name);

        let app_version = match values.get("app_version") {
            Some(v) => v
                .parse()
                .with_context(|| format!("app_version must be an integer, got '{}'", v))?,
            None => defaults.app_version,
        };

        let manifest = values
            .get("manifest")
            .map(|m| expand_home(m))
            .transpose()?;

        Ok(StoreConfig {
            data_dir,
            database_name,
            app_version,
            manifest,
        })
    }

    /// Full path of the database file
    pub fn database_path(&self) -> String {
        format!("{}/{}", self.data_dir.trim_end_matches('/'), self.database_name)
    }

    pub fn to_options(&self) -> StoreOptions {
        StoreOptions::in_dir(&self.database_name, Path::new(&self.data_dir))
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Data Directory:     {}", self.data_dir),
            format!("Database Path:      {}", self.database_path()),
            format!("App Version:        {}", self.app_version),
        ];
        if let Some(manifest) = &self.manifest {
            lines.push(format!("Schema Manifest:    {}", manifest));
        }
        lines.join("\n")
    }
}
