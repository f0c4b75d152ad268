//! Pose estimation contract
//!
//! Correspondence sets in, pose estimates out. The solver behind
//! [`PoseSolver`] is replaceable.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, Vector3};

/// Minimum number of 2D/3D pairs before a solver is invoked
pub const MIN_CORRESPONDENCES: usize = 4;

/// Normalized image-plane point (degrees from the range origin)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePoint {
    pub u: f64,
    pub v: f64,
}

impl ImagePoint {
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// Synthetic pinhole intrinsics derived from the sweep field of view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Intrinsics for an angular image of `width` x `height` degrees.
    ///
    /// Focal length is half the width for both axes, the principal point
    /// sits at the pixel-center of the range.
    pub fn from_field_of_view(width: f64, height: f64) -> Self {
        Self {
            fx: 0.5 * width,
            fy: 0.5 * width,
            cx: 0.5 * (width - 1.0),
            cy: 0.5 * (height - 1.0),
        }
    }

    /// Row-major 3x3 camera matrix
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Project a camera-frame point. `None` when the point is not in front.
    pub fn project(&self, p: [f64; 3]) -> Option<ImagePoint> {
        if p[2] <= f64::EPSILON {
            return None;
        }
        Some(ImagePoint::new(
            self.fx * p[0] / p[2] + self.cx,
            self.fy * p[1] / p[2] + self.cy,
        ))
    }

    /// Back-project a pixel to normalized camera coordinates (z = 1)
    pub fn unproject(&self, point: ImagePoint) -> [f64; 2] {
        [(point.u - self.cx) / self.fx, (point.v - self.cy) / self.fy]
    }
}

/// Index-aligned 2D/3D point sets
///
/// `image_points[i]` was observed for the sensor at `object_points[i]`,
/// whose channel is `channels[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correspondences {
    pub channels: Vec<ChannelId>,
    pub image_points: Vec<ImagePoint>,
    pub object_points: Vec<Vector3>,
}

impl Correspondences {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            channels: Vec::with_capacity(n),
            image_points: Vec::with_capacity(n),
            object_points: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, channel: ChannelId, image: ImagePoint, object: Vector3) {
        self.channels.push(channel);
        self.image_points.push(image);
        self.object_points.push(object);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Pose of the tracked object relative to the station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Translation in the solver's camera frame (meters)
    pub translation: Vector3,

    /// Axis-angle (Rodrigues) rotation vector
    pub rotation: Vector3,

    /// Number of correspondences in the consensus set
    pub inliers: usize,

    /// Reprojection RMS over the inliers (normalized-angle units)
    pub rms: f64,
}

/// Solver output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSolution {
    pub pose: Option<PoseEstimate>,

    /// Indices into the correspondence set
    pub inliers: Vec<usize>,
}

impl PoseSolution {
    /// Solver ran but found nothing
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.pose.is_some()
    }
}

/// Robust perspective-n-point solver
pub trait PoseSolver {
    /// Solver name for logging
    fn name(&self) -> &str;

    /// Estimate the object pose from index-aligned point sets.
    ///
    /// Must not panic on degenerate input; returns [`PoseSolution::failed`]
    /// instead.
    fn solve(
        &mut self,
        object_points: &[Vector3],
        image_points: &[ImagePoint],
        intrinsics: &CameraIntrinsics,
    ) -> PoseSolution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsics_from_field_of_view() {
        let k = CameraIntrinsics::from_field_of_view(124.0, 124.0);
        assert_eq!(k.fx, 62.0);
        assert_eq!(k.fy, 62.0);
        assert_eq!(k.cx, 61.5);
        assert_eq!(k.cy, 61.5);
        assert_eq!(k.matrix()[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_project_unproject() {
        let k = CameraIntrinsics::from_field_of_view(124.0, 124.0);
        let p = k.project([0.1, -0.2, 2.0]).unwrap();
        let n = k.unproject(p);
        assert!((n[0] - 0.05).abs() < 1e-12);
        assert!((n[1] + 0.1).abs() < 1e-12);
        assert!(k.project([0.0, 0.0, -1.0]).is_none());
    }

    #[test]
    fn test_correspondences_stay_aligned() {
        let mut c = Correspondences::with_capacity(2);
        c.push(0, ImagePoint::new(0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        c.push(5, ImagePoint::new(58.0, 42.5), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(c.len(), 2);
        assert_eq!(c.image_points.len(), c.object_points.len());
    }

    #[test]
    fn test_failed_solution() {
        assert!(!PoseSolution::failed().is_success());
    }
}
