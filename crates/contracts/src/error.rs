//! Layered error definitions
//!
//! Categorized by source: config / device / pose / render

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Sensor layout blob is missing a key or holds malformed vectors.
    ///
    /// Fatal at startup: the tracker cannot run without a layout.
    #[error("malformed config at '{field}': {message}")]
    MalformedConfig { field: String, message: String },

    /// Settings file parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Settings validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Per-cycle Conditions =====
    /// Not enough 2D/3D pairs to hand to the pose solver
    #[error("insufficient correspondences: found {found}, need at least {required}")]
    InsufficientCorrespondences { found: usize, required: usize },

    /// The pose solver found no consensus pose
    #[error("no pose found from {correspondences} correspondences")]
    NoPoseFound { correspondences: usize },

    /// Device poll did not complete within its bound
    #[error("device timeout after {timeout_ms}ms")]
    DeviceTimeout { timeout_ms: u64 },

    // ===== Device Errors =====
    /// Tracking source failure
    #[error("device '{source_name}' error: {message}")]
    Device {
        source_name: String,
        message: String,
    },

    /// Tracking source has no more samples (replay finished)
    #[error("source '{source_name}' exhausted")]
    SourceExhausted { source_name: String },

    // ===== Render Errors =====
    /// Renderer failure
    #[error("renderer '{renderer}' error: {message}")]
    Render { renderer: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create malformed layout config error
    pub fn malformed_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create device error
    pub fn device(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create render error
    pub fn render(renderer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            renderer: renderer.into(),
            message: message.into(),
        }
    }

    /// Per-cycle conditions the render loop logs and moves past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCorrespondences { .. }
                | Self::NoPoseFound { .. }
                | Self::DeviceTimeout { .. }
                | Self::Device { .. }
                | Self::Render { .. }
        )
    }
}
