//! Robust perspective-n-point solver
//!
//! [`RansacPnpSolver`] wraps EPnP in the seeded [`ransac`] search and polishes
//! the winning model with Levenberg-Marquardt on its inliers. It implements
//! the [`PoseSolver`] contract, so the engine never sees nalgebra types.

pub mod epnp;
mod pose_utils;
pub mod ransac;

use contracts::{CameraIntrinsics, ImagePoint, PoseEstimate, PoseSolution, PoseSolver, SolverSettings};
use nalgebra::{Isometry3, Point3, Vector2, Vector3};
use thiserror::Error;
use tracing::{debug, trace};

pub use epnp::epnp;
pub use ransac::{ransac, Consensus, RansacOptions, SampleModel};

/// LM iterations applied to refits
const REFINE_ITERS: usize = 20;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PnpError {
    #[error("not enough points: found {found}, need {required}")]
    NotEnoughPoints { found: usize, required: usize },

    #[error("degenerate point configuration")]
    Degenerate,

    #[error("SVD did not converge")]
    SvdFailed,
}

/// One 2D/3D pair as seen by the estimator
#[derive(Debug, Clone, Copy)]
pub struct PnpDatum {
    pub world: Vector3<f64>,
    /// Observed point through the intrinsics
    pub pixel: Vector2<f64>,
    /// Same observation in normalized camera coordinates
    pub normalized: Vector2<f64>,
}

/// EPnP as a RANSAC model
#[derive(Debug, Clone, Copy)]
pub struct PnpEstimator {
    intrinsics: CameraIntrinsics,
}

impl PnpEstimator {
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self { intrinsics }
    }

    /// Pair up points, converting observations to normalized coordinates
    pub fn data(&self, object_points: &[contracts::Vector3], image_points: &[ImagePoint]) -> Vec<PnpDatum> {
        object_points
            .iter()
            .zip(image_points)
            .map(|(p, uv)| {
                let [x, y] = self.intrinsics.unproject(*uv);
                PnpDatum {
                    world: Vector3::new(p.x, p.y, p.z),
                    pixel: Vector2::new(uv.u, uv.v),
                    normalized: Vector2::new(x, y),
                }
            })
            .collect()
    }

    fn split(data: &[PnpDatum], indices: &[usize]) -> (Vec<Vector3<f64>>, Vec<Vector2<f64>>) {
        indices
            .iter()
            .map(|&i| (data[i].world, data[i].normalized))
            .unzip()
    }
}

impl SampleModel for PnpEstimator {
    type Datum = PnpDatum;
    type Model = Isometry3<f64>;

    const SAMPLE_SIZE: usize = 6;

    fn fit_sample(&self, data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
        let (world, image) = Self::split(data, indices);
        epnp(&world, &image).ok()
    }

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> f64 {
        let pc = model * Point3::from(datum.world);
        match self.intrinsics.project([pc.x, pc.y, pc.z]) {
            Some(p) => (Vector2::new(p.u, p.v) - datum.pixel).norm(),
            None => f64::INFINITY,
        }
    }

    fn fit_all(&self, data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model> {
        let (world, image) = Self::split(data, indices);
        let initial = epnp(&world, &image).ok()?;
        Some(pose_utils::refine_pose(&initial, &world, &image, REFINE_ITERS))
    }
}

/// EPnP + RANSAC behind the [`PoseSolver`] contract
#[derive(Debug, Clone)]
pub struct RansacPnpSolver {
    name: String,
    options: RansacOptions,
}

impl RansacPnpSolver {
    pub fn new(settings: &SolverSettings) -> Self {
        Self {
            name: "epnp_ransac".to_string(),
            options: RansacOptions {
                max_iters: settings.max_iters,
                thresh: settings.reprojection_threshold,
                min_inliers: settings.min_inliers,
                confidence: settings.confidence,
                seed: settings.seed,
            },
        }
    }

    pub fn options(&self) -> &RansacOptions {
        &self.options
    }

    /// All-points solve for sets below the minimal sample.
    ///
    /// Accepted only when every point is within the threshold.
    fn solve_direct(&self, estimator: &PnpEstimator, data: &[PnpDatum]) -> Consensus<Isometry3<f64>> {
        let all: Vec<usize> = (0..data.len()).collect();
        let Some(model) = estimator.fit_all(data, &all) else {
            return Consensus::none();
        };
        let residuals: Vec<f64> = data.iter().map(|d| estimator.residual(&model, d)).collect();
        if !residuals.iter().all(|r| *r <= self.options.thresh) {
            trace!(?residuals, "direct solve rejected");
            return Consensus::none();
        }
        Consensus {
            model: Some(model),
            inliers: all,
            rms: ransac::rms(&residuals),
            round: 1,
        }
    }
}

impl Default for RansacPnpSolver {
    fn default() -> Self {
        Self::new(&SolverSettings::default())
    }
}

impl PoseSolver for RansacPnpSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn solve(
        &mut self,
        object_points: &[contracts::Vector3],
        image_points: &[ImagePoint],
        intrinsics: &CameraIntrinsics,
    ) -> PoseSolution {
        if object_points.len() != image_points.len()
            || object_points.len() < contracts::MIN_CORRESPONDENCES
        {
            return PoseSolution::failed();
        }

        let estimator = PnpEstimator::new(*intrinsics);
        let data = estimator.data(object_points, image_points);

        let result = if data.len() < PnpEstimator::SAMPLE_SIZE {
            self.solve_direct(&estimator, &data)
        } else {
            ransac(&estimator, &data, &self.options)
        };

        debug!(
            solver = %self.name,
            points = data.len(),
            found = result.is_found(),
            inliers = result.inliers.len(),
            round = result.round,
            rms = result.rms,
            "pnp solve"
        );

        let Some(model) = result.model else {
            return PoseSolution::failed();
        };
        let t = model.translation.vector;
        let r = model.rotation.scaled_axis();
        PoseSolution {
            pose: Some(PoseEstimate {
                translation: contracts::Vector3::new(t.x, t.y, t.z),
                rotation: contracts::Vector3::new(r.x, r.y, r.z),
                inliers: result.inliers.len(),
                rms: result.rms,
            }),
            inliers: result.inliers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SweepCalibration;
    use nalgebra::{Translation3, UnitQuaternion};

    fn scene(n: usize) -> (Isometry3<f64>, Vec<contracts::Vector3>, Vec<ImagePoint>, CameraIntrinsics) {
        let k = SweepCalibration::default().intrinsics();
        let truth = Isometry3::from_parts(
            Translation3::new(0.04, -0.02, 1.6),
            UnitQuaternion::from_euler_angles(0.2, -0.1, 0.15),
        );
        let object: Vec<contracts::Vector3> = (0..n)
            .map(|i| {
                let t = i as f64 * 1.3;
                contracts::Vector3::new(0.09 * t.cos(), 0.06 * (0.7 * t).sin(), 0.05 * (1.9 * t).cos())
            })
            .collect();
        let image = object
            .iter()
            .map(|p| {
                let pc = truth * Point3::new(p.x, p.y, p.z);
                k.project([pc.x, pc.y, pc.z]).unwrap()
            })
            .collect();
        (truth, object, image, k)
    }

    #[test]
    fn test_solver_recovers_pose() {
        let (truth, object, image, k) = scene(12);
        let mut solver = RansacPnpSolver::default();
        let solution = solver.solve(&object, &image, &k);

        let pose = solution.pose.expect("pose");
        assert_eq!(pose.inliers, 12);
        assert!((pose.translation.x - truth.translation.vector.x).abs() < 1e-4);
        assert!((pose.translation.z - truth.translation.vector.z).abs() < 1e-3);
        let r = truth.rotation.scaled_axis();
        assert!((pose.rotation.x - r.x).abs() < 1e-3);
        assert!(pose.rms < 1e-3);
    }

    #[test]
    fn test_solver_rejects_outliers() {
        let (truth, object, mut image, k) = scene(16);
        image[3] = ImagePoint::new(5.0, 110.0);
        image[11] = ImagePoint::new(100.0, 3.0);

        let mut solver = RansacPnpSolver::default();
        let solution = solver.solve(&object, &image, &k);

        assert!(solution.is_success());
        assert_eq!(solution.inliers.len(), 14);
        assert!(!solution.inliers.contains(&3));
        assert!(!solution.inliers.contains(&11));
        let pose = solution.pose.unwrap();
        assert!((pose.translation.z - truth.translation.vector.z).abs() < 1e-3);
    }

    #[test]
    fn test_direct_solve_below_minimal_sample() {
        let (truth, object, image, k) = scene(5);
        let mut solver = RansacPnpSolver::default();
        let solution = solver.solve(&object, &image, &k);

        let pose = solution.pose.expect("pose");
        assert_eq!(solution.inliers, vec![0, 1, 2, 3, 4]);
        assert!((pose.translation.z - truth.translation.vector.z).abs() < 1e-3);
    }

    #[test]
    fn test_fewer_than_four_fails_without_panic() {
        let (_, object, image, k) = scene(3);
        let mut solver = RansacPnpSolver::default();
        assert!(!solver.solve(&object, &image, &k).is_success());
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let (_, object, image, k) = scene(8);
        let mut solver = RansacPnpSolver::default();
        assert!(!solver.solve(&object, &image[..7], &k).is_success());
    }
}
