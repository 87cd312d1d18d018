//! Error types for the asset tool

use drifter_reflect::ReflectError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised by asset commands
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input directory or config file does not exist
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Validation failed with {0} problem(s)")]
    ValidationFailed(usize),
}

impl ToolError {
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        ToolError::NotFound(path.as_ref().to_path_buf())
    }
}
