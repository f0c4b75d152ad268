//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse the device config blob into a typed `SensorLayout`
//! - Parse TOML/JSON settings files into `TrackerSettings`
//! - Validate settings
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, LayoutLoader};
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("lighthouse.toml")).unwrap();
//! let layout = LayoutLoader::load_from_path(Path::new("hmd.json")).unwrap();
//! println!("{} sensors, station {}", layout.len(), settings.poll.station);
//! ```

mod layout;
mod parser;
mod validator;

pub use contracts::TrackerSettings;
pub use layout::LayoutLoader;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Settings loader
///
/// Provides static methods to load settings from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<TrackerSettings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load settings from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TrackerSettings, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate settings assembled elsewhere (e.g. after CLI overrides)
    pub fn validate(settings: &TrackerSettings) -> Result<(), ContractError> {
        validator::validate(settings)
    }

    /// Serialize settings to TOML string
    pub fn to_toml(settings: &TrackerSettings) -> Result<String, ContractError> {
        toml::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize settings to JSON string
    pub fn to_json(settings: &TrackerSettings) -> Result<String, ContractError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<TrackerSettings, ContractError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        tracing::debug!(?format, "settings loaded");
        Ok(settings)
    }
}
