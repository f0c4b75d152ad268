//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// Startup failures of the `run` command
#[derive(Error, Debug)]
pub enum CliError {
    /// Settings file missing or invalid
    #[error("failed to load settings from {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: contracts::ContractError,
    },

    /// Angle source could not be opened
    #[error("failed to open {kind} source: {message}")]
    SourceSetup { kind: String, message: String },

    /// No usable sensor layout
    #[error("sensor layout unavailable: {0}")]
    Layout(#[source] contracts::ContractError),

    /// Renderer could not be created
    #[error(transparent)]
    Render(#[from] render::RenderError),

    /// Fatal error inside the loop
    #[error("tracking loop failed: {0}")]
    Loop(#[source] contracts::ContractError),
}

impl CliError {
    pub fn source_setup(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceSetup {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
