use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::constants::{DEFAULT_LOG_LEVEL, DEFAULT_STORE_FILE};

/// Runtime settings, layered as defaults < config file < `CALIMA_*` env vars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub store_path: PathBuf,
    pub log_level: String,
    pub max_workers: usize,
}

impl Settings {
    /// Load settings. A missing config file is not an error.
    pub fn load(config_file: &Path) -> Result<Self> {
        let settings = Config::builder()
            .set_default("store_path", DEFAULT_STORE_FILE)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("max_workers", num_cpus::get() as i64)?
            .add_source(File::from(config_file).required(false))
            .add_source(Environment::with_prefix("CALIMA"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
