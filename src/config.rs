use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Connection settings loaded from the module's JSON configuration file.
#[derive(Debug, Deserialize)]
pub struct ModuleConfig {
    pub host: String,
    pub port: u16,
    pub module_name: String,
}

impl ModuleConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {} failed", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("configuration file {} is not valid", path.display()))
    }
}
