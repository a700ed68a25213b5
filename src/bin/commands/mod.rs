pub mod import;
pub mod init;
pub mod query;
pub mod status;

use anyhow::Result;
use fieldstore::{Store, StoreConfig};

/// Open the configured store without bootstrapping it
pub(crate) fn open_store(config: &StoreConfig) -> Result<Store> {
    Ok(Store::open(&config.to_options())?.with_app_version(config.app_version))
}
