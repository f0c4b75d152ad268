//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SensorLayout, TrackerSettings};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    layout_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<LayoutSummary>,
}

#[derive(Serialize)]
struct LayoutSummary {
    sensor_count: usize,
    min: [f64; 3],
    max: [f64; 3],
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(layout = %args.layout.display(), "Validating sensor layout");

    let result = validate_files(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Validation failed")
    }
}

fn validate_files(args: &ValidateArgs) -> ValidationResult {
    let mut result = ValidationResult {
        valid: false,
        layout_path: args.layout.display().to_string(),
        settings_path: args.settings.as_ref().map(|p| p.display().to_string()),
        error: None,
        warnings: None,
        summary: None,
    };

    if !args.layout.exists() {
        result.error = Some(format!("File not found: {}", args.layout.display()));
        return result;
    }

    let layout = match config_loader::LayoutLoader::load_from_path(&args.layout) {
        Ok(layout) => layout,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    let settings = match &args.settings {
        Some(path) => match config_loader::ConfigLoader::load_from_path(path) {
            Ok(settings) => Some(settings),
            Err(e) => {
                result.error = Some(format!("{}: {e}", path.display()));
                return result;
            }
        },
        None => None,
    };

    let warnings = collect_warnings(&layout, settings.as_ref());
    let (min, max) = layout.bounds();
    result.valid = true;
    result.warnings = (!warnings.is_empty()).then_some(warnings);
    result.summary = Some(LayoutSummary {
        sensor_count: layout.len(),
        min: min.to_array(),
        max: max.to_array(),
    });
    result
}

/// Collect layout warnings (non-fatal issues)
fn collect_warnings(layout: &SensorLayout, settings: Option<&TrackerSettings>) -> Vec<String> {
    let mut warnings = Vec::new();

    for (channel, sensor) in layout.iter() {
        let n = sensor.normal;
        let norm = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
        if (norm - 1.0).abs() > 0.05 {
            warnings.push(format!(
                "Sensor {channel} normal is not unit length ({norm:.3})"
            ));
        }
    }

    let (min, max) = layout.bounds();
    let extent = (max.x - min.x).max(max.y - min.y).max(max.z - min.z);
    if extent < 1e-6 {
        warnings.push("All sensors share one position - pose is unobservable".to_string());
    }

    if let Some(settings) = settings {
        if settings.render.frame_interval_ms > 1000 {
            warnings.push(format!(
                "render.frame_interval_ms is {} - display will update slower than 1 Hz",
                settings.render.frame_interval_ms
            ));
        }
        if settings.solver.reprojection_threshold > settings.calibration.horizontal.span() / 4.0 {
            warnings.push(
                "solver.reprojection_threshold is large relative to the field of view".to_string(),
            );
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Layout is valid: {}", result.layout_path);
        if let Some(ref path) = result.settings_path {
            println!("✓ Settings are valid: {}", path);
        }

        if let Some(ref summary) = result.summary {
            println!("\n  Sensors: {}", summary.sensor_count);
            println!(
                "  Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
                summary.min[0],
                summary.min[1],
                summary.min[2],
                summary.max[0],
                summary.max[1],
                summary.max[2]
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Validation failed: {}", result.layout_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn write_layout(dir: &Path) -> PathBuf {
        let path = dir.join("config.json");
        let layout = tracker::synthetic_layout().unwrap();
        let json = config_loader::LayoutLoader::to_json(&layout, Some("LHR-TEST")).unwrap();
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_valid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let args = ValidateArgs {
            layout: write_layout(dir.path()),
            settings: None,
            json: true,
        };
        let result = validate_files(&args);
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().sensor_count, 32);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            layout: PathBuf::from("/nonexistent/config.json"),
            settings: None,
            json: false,
        };
        let result = validate_files(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_missing_normals_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"lighthouse_config": {"modelPoints": []}}"#).unwrap();
        let result = validate_files(&ValidateArgs {
            layout: path,
            settings: None,
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("modelNormals"));
    }

    #[test]
    fn test_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.toml");
        std::fs::write(&settings, "[poll]\ntimeout_ms = 0\n").unwrap();
        let result = validate_files(&ValidateArgs {
            layout: write_layout(dir.path()),
            settings: Some(settings),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("timeout_ms"));
    }
}
