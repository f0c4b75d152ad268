//! Device config blob parsing
//!
//! The tracked device reports its geometry as a JSON document. Only the two
//! layout arrays under `lighthouse_config` are consumed; everything else is
//! ignored apart from the serial number, which is logged.

use std::path::Path;

use contracts::{ContractError, SensorLayout};
use serde::{Deserialize, Serialize};

const ROOT_FIELD: &str = "lighthouse_config";
const POINTS_FIELD: &str = "lighthouse_config.modelPoints";
const NORMALS_FIELD: &str = "lighthouse_config.modelNormals";

/// Device-shaped config document
#[derive(Debug, Serialize, Deserialize)]
struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mb_serial_number: Option<String>,

    #[serde(default)]
    lighthouse_config: Option<LighthouseConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LighthouseConfig {
    #[serde(default)]
    model_points: Option<Vec<[f64; 3]>>,

    #[serde(default)]
    model_normals: Option<Vec<[f64; 3]>>,
}

/// Sensor layout loader
pub struct LayoutLoader;

impl LayoutLoader {
    /// Parse a raw config blob as returned by the device.
    ///
    /// # Errors
    /// `MalformedConfig` on invalid JSON, a missing key, an element that is not
    /// a 3-vector of numbers, or a layout of the wrong size.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<SensorLayout, ContractError> {
        let doc: DeviceConfig = serde_json::from_slice(bytes)
            .map_err(|e| ContractError::malformed_config(ROOT_FIELD, e.to_string()))?;
        Self::into_layout(doc)
    }

    /// Parse a config blob held as text
    pub fn load_from_str(content: &str) -> Result<SensorLayout, ContractError> {
        Self::load_from_bytes(content.as_bytes())
    }

    /// Read and parse a layout file
    pub fn load_from_path(path: &Path) -> Result<SensorLayout, ContractError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }

    /// Emit a device-shaped JSON blob for `layout`
    pub fn to_json(layout: &SensorLayout, serial: Option<&str>) -> Result<String, ContractError> {
        let doc = DeviceConfig {
            mb_serial_number: serial.map(str::to_string),
            lighthouse_config: Some(LighthouseConfig {
                model_points: Some(layout.points()),
                model_normals: Some(layout.normals()),
            }),
        };
        serde_json::to_string_pretty(&doc)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn into_layout(doc: DeviceConfig) -> Result<SensorLayout, ContractError> {
        if let Some(serial) = &doc.mb_serial_number {
            tracing::info!(mb_serial_number = %serial, "device config loaded");
        }

        let config = doc
            .lighthouse_config
            .ok_or_else(|| ContractError::malformed_config(ROOT_FIELD, "key is absent"))?;
        let points = config
            .model_points
            .ok_or_else(|| ContractError::malformed_config(POINTS_FIELD, "key is absent"))?;
        let normals = config
            .model_normals
            .ok_or_else(|| ContractError::malformed_config(NORMALS_FIELD, "key is absent"))?;

        tracing::debug!(points = points.len(), normals = normals.len(), "layout arrays parsed");

        SensorLayout::from_arrays(&points, &normals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SENSOR_COUNT;
    use std::io::Write;

    fn blob(points: usize, normals: usize) -> String {
        let p: Vec<[f64; 3]> = (0..points).map(|i| [i as f64 * 0.001, 0.02, -0.01]).collect();
        let n: Vec<[f64; 3]> = (0..normals).map(|_| [0.0, 0.0, 1.0]).collect();
        serde_json::json!({
            "mb_serial_number": "LHR-TEST0001",
            "lighthouse_config": { "modelPoints": p, "modelNormals": n }
        })
        .to_string()
    }

    #[test]
    fn test_load_full_layout() {
        let layout = LayoutLoader::load_from_str(&blob(SENSOR_COUNT, SENSOR_COUNT)).unwrap();
        assert_eq!(layout.points().len(), 32);
        assert_eq!(layout.normals().len(), 32);
    }

    #[test]
    fn test_missing_normals() {
        let content = r#"{"lighthouse_config": {"modelPoints": [[0.0, 0.0, 0.0]]}}"#;
        let err = LayoutLoader::load_from_str(content).unwrap_err();
        match err {
            ContractError::MalformedConfig { field, .. } => assert_eq!(field, NORMALS_FIELD),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_root_key() {
        let err = LayoutLoader::load_from_str(r#"{"mb_serial_number": "x"}"#).unwrap_err();
        assert!(matches!(err, ContractError::MalformedConfig { ref field, .. } if field == ROOT_FIELD));
    }

    #[test]
    fn test_length_mismatch() {
        let err = LayoutLoader::load_from_str(&blob(SENSOR_COUNT, 30)).unwrap_err();
        assert!(matches!(err, ContractError::MalformedConfig { .. }));
    }

    #[test]
    fn test_element_not_a_vector() {
        let content = r#"{"lighthouse_config": {"modelPoints": [[0.0, "a", 0.0]], "modelNormals": [[0.0, 0.0, 1.0]]}}"#;
        let err = LayoutLoader::load_from_str(content).unwrap_err();
        assert!(matches!(err, ContractError::MalformedConfig { .. }));

        let content = r#"{"lighthouse_config": {"modelPoints": [[0.0, 1.0]], "modelNormals": [[0.0, 0.0, 1.0]]}}"#;
        assert!(LayoutLoader::load_from_str(content).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = LayoutLoader::load_from_bytes(b"{ not json").unwrap_err();
        assert!(matches!(err, ContractError::MalformedConfig { .. }));
    }

    #[test]
    fn test_round_trip() {
        let layout = LayoutLoader::load_from_str(&blob(SENSOR_COUNT, SENSOR_COUNT)).unwrap();
        let json = LayoutLoader::to_json(&layout, Some("LHR-TEST0001")).unwrap();
        assert!(json.contains("modelPoints"));
        let again = LayoutLoader::load_from_str(&json).unwrap();
        assert_eq!(layout, again);
    }

    #[test]
    fn test_round_trip_keeps_every_bit() {
        // Shortest-repr values that a fast float parser rounds one ULP off
        let points: Vec<[f64; 3]> = (0..SENSOR_COUNT)
            .map(|i| [0.058124999999999996, 0.1 + i as f64 * 0.003, -0.07])
            .collect();
        let normals: Vec<[f64; 3]> = (0..SENSOR_COUNT)
            .map(|i| {
                let a = i as f64 * 0.3;
                [a.cos() * 0.6, a.sin() * 0.6, 0.8]
            })
            .collect();
        let layout = SensorLayout::from_arrays(&points, &normals).unwrap();

        let json = LayoutLoader::to_json(&layout, None).unwrap();
        let again = LayoutLoader::load_from_str(&json).unwrap();
        assert_eq!(layout, again);
        for (channel, sensor) in again.iter() {
            let expected = points[channel as usize];
            assert_eq!(sensor.position.to_array(), expected);
        }
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(blob(SENSOR_COUNT, SENSOR_COUNT).as_bytes()).unwrap();
        let layout = LayoutLoader::load_from_path(file.path()).unwrap();
        assert_eq!(layout.len(), SENSOR_COUNT);
    }
}
