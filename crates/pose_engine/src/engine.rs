//! Per-cycle pose pipeline: normalize, correspond, solve.

use std::time::{Duration, Instant};

use contracts::{
    AngleSample, CameraIntrinsics, ContractError, Correspondences, PoseEstimate, PoseSolver,
    SensorLayout, SweepCalibration,
};
use tracing::{debug, instrument};

use crate::correspondence::{ensure_solvable, CorrespondenceBuilder};
use crate::normalizer::AngleNormalizer;

/// Result of one [`PoseEngine::process`] call
#[derive(Debug)]
pub struct CycleOutcome {
    /// Everything the sample could be paired with, for the angle panel
    pub correspondences: Correspondences,

    /// `InsufficientCorrespondences` or `NoPoseFound` when no pose came out
    pub pose: Result<PoseEstimate, ContractError>,

    /// Time spent in the solver; `None` when it was not invoked
    pub solve_time: Option<Duration>,
}

impl CycleOutcome {
    pub fn solver_invoked(&self) -> bool {
        self.solve_time.is_some()
    }
}

/// Pose pipeline over a fixed layout
pub struct PoseEngine<S> {
    builder: CorrespondenceBuilder,
    layout: SensorLayout,
    intrinsics: CameraIntrinsics,
    solver: S,
    cycles: u64,
}

impl<S: PoseSolver> PoseEngine<S> {
    pub fn new(layout: SensorLayout, calibration: SweepCalibration, solver: S) -> Self {
        Self {
            builder: CorrespondenceBuilder::new(AngleNormalizer::new(calibration)),
            intrinsics: calibration.intrinsics(),
            layout,
            solver,
            cycles: 0,
        }
    }

    pub fn layout(&self) -> &SensorLayout {
        &self.layout
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one sample through the pipeline.
    ///
    /// Never fails as a whole: per-cycle conditions land in
    /// [`CycleOutcome::pose`].
    #[instrument(
        level = "debug",
        name = "pose_engine_process",
        skip(self, sample),
        fields(station = %sample.station, entries = sample.len())
    )]
    pub fn process(&mut self, sample: &AngleSample) -> CycleOutcome {
        self.cycles += 1;
        let correspondences = self.builder.collect(sample, &self.layout);
        metrics::histogram!("lighthouse_correspondences").record(correspondences.len() as f64);

        if let Err(err) = ensure_solvable(&correspondences) {
            metrics::counter!("lighthouse_pose_solves_total", "status" => "skipped").increment(1);
            debug!(error = %err, "pose solve skipped");
            return CycleOutcome {
                correspondences,
                pose: Err(err),
                solve_time: None,
            };
        }

        let start = Instant::now();
        let solution = self.solver.solve(
            &correspondences.object_points,
            &correspondences.image_points,
            &self.intrinsics,
        );
        let elapsed = start.elapsed();
        metrics::histogram!("lighthouse_pose_solve_seconds", "solver" => self.solver.name().to_string())
            .record(elapsed.as_secs_f64());

        let pose = match solution.pose {
            Some(pose) => {
                metrics::counter!("lighthouse_pose_solves_total", "status" => "ok").increment(1);
                metrics::histogram!("lighthouse_pose_inlier_ratio")
                    .record(pose.inliers as f64 / correspondences.len() as f64);
                debug!(
                    inliers = pose.inliers,
                    rms = pose.rms,
                    tz = pose.translation.z,
                    "pose solved"
                );
                Ok(pose)
            }
            None => {
                metrics::counter!("lighthouse_pose_solves_total", "status" => "no_pose")
                    .increment(1);
                Err(ContractError::NoPoseFound {
                    correspondences: correspondences.len(),
                })
            }
        };

        CycleOutcome {
            correspondences,
            pose,
            solve_time: Some(elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ImagePoint, PoseSolution, Station, Vector3, SENSOR_COUNT};

    /// Counts calls and returns a canned answer
    struct CountingSolver {
        calls: usize,
        answer: Option<PoseEstimate>,
    }

    impl PoseSolver for CountingSolver {
        fn name(&self) -> &str {
            "counting"
        }

        fn solve(
            &mut self,
            object_points: &[Vector3],
            image_points: &[ImagePoint],
            _intrinsics: &CameraIntrinsics,
        ) -> PoseSolution {
            self.calls += 1;
            assert_eq!(object_points.len(), image_points.len());
            PoseSolution {
                pose: self.answer,
                inliers: (0..object_points.len()).collect(),
            }
        }
    }

    fn layout() -> SensorLayout {
        let points: Vec<[f64; 3]> = (0..SENSOR_COUNT).map(|i| [i as f64, 1.0, 2.0]).collect();
        SensorLayout::from_arrays(&points, &vec![[0.0, 0.0, 1.0]; SENSOR_COUNT]).unwrap()
    }

    fn engine(answer: Option<PoseEstimate>) -> PoseEngine<CountingSolver> {
        PoseEngine::new(
            layout(),
            SweepCalibration::default(),
            CountingSolver { calls: 0, answer },
        )
    }

    fn sample(n: u8) -> AngleSample {
        AngleSample::from_pairs(Station::A, (0..n).map(|i| (i, (100_000, 90_000))))
    }

    fn estimate() -> PoseEstimate {
        PoseEstimate {
            translation: Vector3::new(0.0, 0.0, 1.5),
            rotation: Vector3::default(),
            inliers: 5,
            rms: 0.1,
        }
    }

    #[test]
    fn test_solver_never_called_below_four() {
        let mut engine = engine(Some(estimate()));
        for n in 0..4 {
            let outcome = engine.process(&sample(n));
            assert_eq!(outcome.correspondences.len(), n as usize);
            assert!(matches!(
                outcome.pose,
                Err(ContractError::InsufficientCorrespondences { .. })
            ));
            assert!(!outcome.solver_invoked());
        }
        assert_eq!(engine.solver().calls, 0);
        assert_eq!(engine.cycles(), 4);
    }

    #[test]
    fn test_failed_solve_is_no_pose_found() {
        let mut engine = engine(None);
        let outcome = engine.process(&sample(6));
        assert_eq!(engine.solver().calls, 1);
        assert!(matches!(
            outcome.pose,
            Err(ContractError::NoPoseFound { correspondences: 6 })
        ));
        assert!(outcome.pose.unwrap_err().is_recoverable());
    }

    #[test]
    fn test_successful_solve_passes_pose_through() {
        let mut engine = engine(Some(estimate()));
        let outcome = engine.process(&sample(5));
        assert_eq!(outcome.pose.unwrap(), estimate());
        assert!(outcome.solve_time.is_some());
    }

    #[test]
    fn test_unknown_channels_do_not_reach_solver() {
        let mut engine = engine(Some(estimate()));
        let sample = AngleSample::from_pairs(
            Station::A,
            [0, 1, 2, 40, 41].map(|channel| (channel, (100_000, 90_000))),
        );
        let outcome = engine.process(&sample);
        assert_eq!(outcome.correspondences.channels, vec![0, 1, 2]);
        assert!(matches!(
            outcome.pose,
            Err(ContractError::InsufficientCorrespondences { found: 3, required: 4 })
        ));
        assert!(outcome.solve_time.is_none());
        assert_eq!(engine.solver().calls, 0);
    }

    #[test]
    fn test_intrinsics_follow_calibration() {
        let engine = engine(None);
        assert_eq!(engine.intrinsics().fx, 62.0);
        assert_eq!(engine.intrinsics().cy, 61.5);
    }
}
