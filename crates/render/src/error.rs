//! Render error types

use thiserror::Error;

/// Render-specific errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Backend not compiled in or failed to start
    #[error("render backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// Renderer operation error (from contract)
    #[error("renderer error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl RenderError {
    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
