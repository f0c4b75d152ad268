//! Renderer trait - visualization output interface
//!
//! Three panels: pose view, station-angle scatter and the static sensor
//! layout. Pose artifacts are addressed through handles so the caller owns
//! the "what is on screen" state.

use serde::{Deserialize, Serialize};

use crate::{ContractError, Correspondences, PoseEstimate, SensorLayout};

/// Handle to pose artifacts currently drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoseHandle(pub u64);

/// Pose remapped into the display frame
///
/// Solver frame `(x, y, z)` maps to `(x, -z, y)` for both the translation
/// and the rotation vector, giving a z-up view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPose {
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
}

impl DisplayPose {
    pub fn remap(v: [f64; 3]) -> [f64; 3] {
        [v[0], -v[2], v[1]]
    }

    pub fn from_estimate(pose: &PoseEstimate) -> Self {
        Self {
            translation: Self::remap(pose.translation.to_array()),
            rotation: Self::remap(pose.rotation.to_array()),
        }
    }
}

/// Visualization backend
pub trait Renderer {
    /// Renderer name (used for logging)
    fn name(&self) -> &str;

    /// Draw the static layout panel, once at startup
    fn draw_layout(&mut self, layout: &SensorLayout) -> Result<(), ContractError>;

    /// Replace the angle scatter with this cycle's points
    fn draw_angles(&mut self, points: &Correspondences) -> Result<(), ContractError>;

    /// Draw pose artifacts and return a handle for later removal
    fn draw_pose(&mut self, pose: &DisplayPose) -> Result<PoseHandle, ContractError>;

    /// Remove previously drawn pose artifacts
    ///
    /// # Errors
    /// `Render` if the handle is unknown
    fn remove_pose(&mut self, handle: PoseHandle) -> Result<(), ContractError>;

    /// Flush the frame
    fn present(&mut self) -> Result<(), ContractError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn draw_layout(&mut self, layout: &SensorLayout) -> Result<(), ContractError> {
        (**self).draw_layout(layout)
    }

    fn draw_angles(&mut self, points: &Correspondences) -> Result<(), ContractError> {
        (**self).draw_angles(points)
    }

    fn draw_pose(&mut self, pose: &DisplayPose) -> Result<PoseHandle, ContractError> {
        (**self).draw_pose(pose)
    }

    fn remove_pose(&mut self, handle: PoseHandle) -> Result<(), ContractError> {
        (**self).remove_pose(handle)
    }

    fn present(&mut self) -> Result<(), ContractError> {
        (**self).present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector3;

    #[test]
    fn test_display_remap() {
        let pose = PoseEstimate {
            translation: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.1, 0.2, 0.3),
            inliers: 8,
            rms: 0.5,
        };
        let d = DisplayPose::from_estimate(&pose);
        assert_eq!(d.translation, [1.0, -3.0, 2.0]);
        assert_eq!(d.rotation, [0.1, -0.3, 0.2]);
    }
}
