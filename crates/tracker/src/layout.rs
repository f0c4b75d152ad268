//! Built-in synthetic sensor layout
//!
//! 32 sensors spread over an HMD-sized ellipsoid with a golden-angle spiral,
//! normals taken from the ellipsoid surface gradient.

use contracts::{ContractError, SensorLayout, SENSOR_COUNT};
use nalgebra::Vector3;

/// Semi-axes of the synthetic shell (meters)
pub const SHELL_RADII: [f64; 3] = [0.09, 0.06, 0.05];

/// Synthetic layout used when no device config is available.
pub fn synthetic_layout() -> Result<SensorLayout, ContractError> {
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    let radii = Vector3::from(SHELL_RADII);

    let mut points = Vec::with_capacity(SENSOR_COUNT);
    let mut normals = Vec::with_capacity(SENSOR_COUNT);
    for i in 0..SENSOR_COUNT {
        let y = 1.0 - 2.0 * (i as f64 + 0.5) / SENSOR_COUNT as f64;
        let r = (1.0 - y * y).sqrt();
        let theta = golden * i as f64;
        let unit = Vector3::new(r * theta.cos(), y, r * theta.sin());

        let position = unit.component_mul(&radii);
        let normal = unit.component_div(&radii).normalize();
        points.push([position.x, position.y, position.z]);
        normals.push([normal.x, normal.y, normal.z]);
    }

    SensorLayout::from_arrays(&points, &normals)
}
