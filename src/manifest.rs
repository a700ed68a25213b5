//! Schema manifest files
//!
//! A manifest lists the table schemas and the alteration log of an
//! application in one TOML file:
//!
//! ```toml
//! tables = ["CREATE TABLE IF NOT EXISTS T (Id INTEGER)"]
//!
//! [[alterations]]
//! id = 1
//! sql = "ALTER TABLE T ADD COLUMN Name TEXT"
//! ```

use anyhow::{anyhow, Context, Result};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::database::{Alteration, MigrationLog};

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    tables: Vec<String>,
    #[serde(default)]
    alterations: Vec<Alteration>,
}

/// Table schemas plus a validated migration log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaManifest {
    pub tables: Vec<String>,
    pub log: MigrationLog,
}

impl SchemaManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert manifest path to string"))?;

        let file = Config::builder()
            .add_source(File::new(path_str, FileFormat::Toml))
            .build()
            .with_context(|| format!("Failed to read manifest {}", path.display()))?
            .try_deserialize::<ManifestFile>()
            .with_context(|| format!("Malformed manifest {}", path.display()))?;

        let log = MigrationLog::from_entries(file.alterations)
            .with_context(|| format!("Bad alteration list in {}", path.display()))?;

        Ok(SchemaManifest {
            tables: file.tables,
            log,
        })
    }
}
