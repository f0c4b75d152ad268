//! SensorLayout - Config Loader output
//!
//! Photosensor positions and normals of the tracked object, indexed by
//! physical channel id.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, ContractError};

/// Number of photosensor channels on the tracked HMD
pub const SENSOR_COUNT: usize = 32;

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// One photosensor: where it sits and which way it faces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Position in the object frame (meters)
    pub position: Vector3,

    /// Outward unit normal
    pub normal: Vector3,
}

/// Immutable sensor layout
///
/// Index in `sensors` is the channel id reported by the hardware, so the
/// layout is the join target for angle samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLayout {
    sensors: Vec<SensorRecord>,
}

impl SensorLayout {
    /// Build a layout from index-aligned position and normal arrays.
    ///
    /// # Errors
    /// `MalformedConfig` if the lengths differ or the count is not
    /// [`SENSOR_COUNT`].
    pub fn from_arrays(points: &[[f64; 3]], normals: &[[f64; 3]]) -> Result<Self, ContractError> {
        if points.len() != normals.len() {
            return Err(ContractError::malformed_config(
                "lighthouse_config",
                format!(
                    "modelPoints has {} entries but modelNormals has {}",
                    points.len(),
                    normals.len()
                ),
            ));
        }
        if points.len() != SENSOR_COUNT {
            return Err(ContractError::malformed_config(
                "lighthouse_config.modelPoints",
                format!("expected {} sensors, got {}", SENSOR_COUNT, points.len()),
            ));
        }

        let sensors = points
            .iter()
            .zip(normals)
            .map(|(p, n)| SensorRecord {
                position: Vector3::from(*p),
                normal: Vector3::from(*n),
            })
            .collect();

        Ok(Self { sensors })
    }

    /// Number of sensors
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Look up the record for a channel
    pub fn get(&self, channel: ChannelId) -> Option<&SensorRecord> {
        self.sensors.get(channel as usize)
    }

    /// Records in channel order
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &SensorRecord)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, record)| (i as ChannelId, record))
    }

    /// All positions in channel order
    pub fn points(&self) -> Vec<[f64; 3]> {
        self.sensors.iter().map(|s| s.position.to_array()).collect()
    }

    /// All normals in channel order
    pub fn normals(&self) -> Vec<[f64; 3]> {
        self.sensors.iter().map(|s| s.normal.to_array()).collect()
    }

    /// Axis-aligned bounds of the sensor positions as (min, max)
    pub fn bounds(&self) -> (Vector3, Vector3) {
        let mut min = Vector3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vector3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for s in &self.sensors {
            let p = s.position;
            min = Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        (min, max)
    }
}
