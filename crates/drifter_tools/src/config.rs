//! Tool configuration
//!
//! Settings come from, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Config file: `--config FILE`, else `drifter.toml` in the working directory
//! 3. Environment: `DRIFTER_ASSET_INPUT`, `DRIFTER_ASSET_OUTPUT`, `DRIFTER_ASSET_MANIFEST`
//! 4. Command-line flags
//!
//! # Example Config File
//!
//! ```toml
//! input = "assets"
//! output = "assets/processed"
//! manifest = "assets/manifest.json"
//!
//! [persist]
//! create_dirs = true
//! sync = true
//! ```

use crate::error::{Result, ToolError};
use drifter_reflect::PersistConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "drifter.toml";

pub const ENV_INPUT: &str = "DRIFTER_ASSET_INPUT";
pub const ENV_OUTPUT: &str = "DRIFTER_ASSET_OUTPUT";
pub const ENV_MANIFEST: &str = "DRIFTER_ASSET_MANIFEST";

/// Paths and persistence settings for asset commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Asset source directory
    pub input: PathBuf,
    /// Destination for `process`
    pub output: PathBuf,
    /// Manifest file written by `manifest`
    pub manifest: PathBuf,
    pub persist: PersistConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("assets"),
            output: PathBuf::from("assets/processed"),
            manifest: PathBuf::from("assets/manifest.json"),
            persist: PersistConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Load from the file sources, then apply environment overrides.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::from_file(DEFAULT_CONFIG_FILE) {
                Ok(config) => config,
                Err(ToolError::NotFound(_)) => Self::default(),
                Err(e) => return Err(e),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ToolError::not_found(path)),
            Err(e) => return Err(e.into()),
        };
        let config = toml::from_str(&text).map_err(|source| ToolError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded tool config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from an environment lookup; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (ENV_INPUT, &mut self.input),
            (ENV_OUTPUT, &mut self.output),
            (ENV_MANIFEST, &mut self.manifest),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                log::info!("{} from env: {}", key, value);
                *slot = PathBuf::from(value);
            }
        }
    }

    /// Apply command-line overrides
    pub fn apply_flags(
        &mut self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        manifest: Option<PathBuf>,
    ) {
        if let Some(input) = input {
            self.input = input;
        }
        if let Some(output) = output {
            self.output = output;
        }
        if let Some(manifest) = manifest {
            self.manifest = manifest;
        }
    }
}
