//! Error type shared by the library modules.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Ledger file, command line flag or dataset layout is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    /// Task key that no tool knows how to handle
    #[error("Task not recognized: {0}")]
    InvalidTask(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot determine orientation: {0}")]
    Orientation(String),

    /// External program missing from PATH
    #[error("{tool} not found. {hint}")]
    ToolNotFound { tool: String, hint: String },
}
