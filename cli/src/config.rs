use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CliError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CliConfig {
    pub store_path: String,
    pub default_cycle_hours: i64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_path: "claimpilot-store.json".to_string(),
            default_cycle_hours: 24,
        }
    }
}

pub fn load_config(path: &str) -> Result<CliConfig, CliError> {
    if !Path::new(path).exists() {
        return Ok(CliConfig::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::ConfigNotFound(e.to_string()))?;

    let config: CliConfig = toml::from_str(&contents)
        .map_err(|e| CliError::InvalidConfig(e.to_string()))?;

    Ok(config)
}
