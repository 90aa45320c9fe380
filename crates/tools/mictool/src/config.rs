//! Mictool configuration
//!
//! Settings come from a TOML file given with `--config`, else from the path in
//! `MICTOOL_CONFIG`, else the defaults below. Command-line flags override
//! whatever the file says.

use anyhow::{Context, Result};
use mic::GridType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when `--config` is absent
pub const CONFIG_ENV: &str = "MICTOOL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MictoolConfig {
    /// Grid type assumed for input files
    pub grid: GridType,
    /// Target resolution for `refine` when no `--min-res` is given
    pub min_resolution: Option<f64>,
    /// Target resolution for `init` when no `--res` is given
    pub init_resolution: Option<f64>,
}

impl Default for MictoolConfig {
    fn default() -> Self {
        Self {
            grid: GridType::Triangular,
            min_resolution: None,
            init_resolution: None,
        }
    }
}

impl MictoolConfig {
    /// Resolve the config source and load it
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
