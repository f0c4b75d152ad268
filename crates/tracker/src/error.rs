//! Tracker error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Tracker specific error
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Recording could not be opened or read
    #[error("failed to load recording '{}': {message}", path.display())]
    RecordingLoad { path: PathBuf, message: String },

    /// A JSONL line did not parse
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TrackerError {
    /// Create recording load error
    pub fn recording_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RecordingLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TrackerError>;
