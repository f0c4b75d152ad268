//! # Integration Tests
//!
//! Cross-crate tests.
//!
//! Covers:
//! - Settings and layout loading through to the tracking types
//! - Simulated and replayed samples end to end (source -> engine -> renderer)
//! - Per-cycle failure handling at the render boundary

#[cfg(test)]
mod contract_tests {
    use contracts::{TrackerSettings, MIN_CORRESPONDENCES, SENSOR_COUNT};

    #[test]
    fn test_contract_constants() {
        assert_eq!(SENSOR_COUNT, 32);
        assert_eq!(MIN_CORRESPONDENCES, 4);
    }

    #[test]
    fn test_settings_round_trip() {
        let mut settings = TrackerSettings::default();
        settings.poll.timeout_ms = 250;
        settings.source.simulated.outlier_rate = 0.1;

        let toml = config_loader::ConfigLoader::to_toml(&settings).unwrap();
        let from_toml =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(from_toml, settings);

        let json = config_loader::ConfigLoader::to_json(&settings).unwrap();
        let from_json =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();
        assert_eq!(from_json, settings);
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::{
        AngleSample, ContractError, DisplayPose, PoseEstimate, PoseHandle, PoseSolution,
        PoseSolver, Renderer, SensorLayout, Station, SweepCalibration, Vector3,
    };
    use pose_engine::PoseEngine;
    use render::{render_step, LogRenderer, VisualizationState};

    /// Solver that succeeds on its first call only
    struct FirstCallOnly {
        calls: usize,
    }

    impl PoseSolver for FirstCallOnly {
        fn name(&self) -> &str {
            "first_call_only"
        }

        fn solve(
            &mut self,
            object_points: &[Vector3],
            _image_points: &[contracts::ImagePoint],
            _intrinsics: &contracts::CameraIntrinsics,
        ) -> PoseSolution {
            self.calls += 1;
            if self.calls > 1 {
                return PoseSolution::failed();
            }
            PoseSolution {
                pose: Some(PoseEstimate {
                    translation: Vector3::new(0.0, 0.0, 1.5),
                    rotation: Vector3::default(),
                    inliers: object_points.len(),
                    rms: 0.1,
                }),
                inliers: (0..object_points.len()).collect(),
            }
        }
    }

    fn layout() -> SensorLayout {
        tracker::synthetic_layout().unwrap()
    }

    fn six_entry_sample() -> AngleSample {
        AngleSample::from_pairs(
            Station::A,
            [
                (0, (150_000, 130_000)),
                (1, (152_000, 131_000)),
                (2, (154_000, 129_000)),
                (3, (151_000, 133_000)),
                (4, (149_000, 128_000)),
                (5, (153_000, 132_000)),
            ],
        )
    }

    #[test]
    fn test_two_entry_sample_skips_solver() {
        let mut engine = PoseEngine::new(layout(), SweepCalibration::default(), FirstCallOnly { calls: 0 });
        let sample = AngleSample::from_pairs(Station::A, [(0, (71_111, 55_555)), (5, (200_000, 150_000))]);

        let outcome = engine.process(&sample);
        assert!(!outcome.solver_invoked());
        assert_eq!(engine.solver().calls, 0);
        assert_eq!(outcome.correspondences.channels, vec![0, 5]);
        let p = &outcome.correspondences.image_points;
        assert!(p[0].u.abs() < 1e-3 && p[0].v.abs() < 1e-3);
        assert!((p[1].u - 58.0).abs() < 1e-3 && (p[1].v - 42.5).abs() < 1e-3);
        assert_eq!(outcome.correspondences.object_points[1], layout().get(5).unwrap().position);
        assert!(matches!(
            outcome.pose,
            Err(ContractError::InsufficientCorrespondences { found: 2, required: 4 })
        ));
    }

    #[test]
    fn test_missing_normals_is_malformed() {
        let blob = br#"{"lighthouse_config": {"modelPoints": [[0.0, 0.0, 0.0]]}}"#;
        let err = config_loader::LayoutLoader::load_from_bytes(blob).unwrap_err();
        assert!(matches!(err, ContractError::MalformedConfig { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_failed_solve_keeps_displayed_pose() {
        let mut engine = PoseEngine::new(layout(), SweepCalibration::default(), FirstCallOnly { calls: 0 });
        let mut renderer = LogRenderer::new("scenario");
        renderer.draw_layout(engine.layout()).unwrap();

        let sample = six_entry_sample();
        let first = engine.process(&sample);
        let state = render_step(
            &mut renderer,
            VisualizationState::default(),
            first.pose.as_ref().ok(),
            &first.correspondences,
        )
        .unwrap();
        let shown: Option<DisplayPose> = state.displayed;
        let handle: Option<PoseHandle> = state.pose;
        assert!(handle.is_some());

        let second = engine.process(&sample);
        assert!(matches!(second.pose, Err(ContractError::NoPoseFound { .. })));
        let state = render_step(
            &mut renderer,
            state,
            second.pose.as_ref().ok(),
            &second.correspondences,
        )
        .unwrap();

        assert_eq!(state.pose, handle);
        assert_eq!(state.displayed, shown);
        assert_eq!(renderer.live_poses(), 1);
        assert_eq!(renderer.removals(), 0);
        assert_eq!(state.frames, 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{SimulatedSettings, SolverSettings, Station, SweepCalibration, TrackingSource};
    use pose_engine::{PoseEngine, RansacPnpSolver};
    use render::{render_step, LogRenderer, VisualizationState};
    use tracker::{ReplayConfig, ReplayRecord, ReplayTracker, SimulatedTracker};

    fn simulator(settings: SimulatedSettings) -> SimulatedTracker {
        SimulatedTracker::new(
            tracker::synthetic_layout().unwrap(),
            SweepCalibration::default(),
            1000,
            settings,
        )
        .unwrap()
    }

    /// End-to-end: SimulatedTracker -> PoseEngine -> LogRenderer
    ///
    /// The device config blob is the only layout source, as with hardware.
    #[tokio::test]
    async fn test_e2e_simulated_pipeline() {
        let mut source = simulator(SimulatedSettings {
            noise_ticks: 0.0,
            ..SimulatedSettings::default()
        });
        let blob = source.get_config().await.unwrap();
        let layout = config_loader::LayoutLoader::load_from_bytes(&blob).unwrap();

        let mut engine = PoseEngine::new(layout, SweepCalibration::default(), RansacPnpSolver::default());
        let mut renderer = LogRenderer::new("e2e");
        let mut state = VisualizationState::default();

        for _ in 0..10 {
            let sample = source
                .poll_angles(Station::A, Duration::from_millis(1000))
                .await
                .unwrap();
            let outcome = engine.process(&sample);
            let pose = outcome.pose.as_ref().ok();

            if let Some(pose) = pose {
                let truth = source.last_ground_truth().unwrap();
                let t = truth.translation.vector;
                assert!((pose.translation.x - t.x).abs() < 0.02, "x {} vs {}", pose.translation.x, t.x);
                assert!((pose.translation.y - t.y).abs() < 0.02, "y {} vs {}", pose.translation.y, t.y);
                assert!((pose.translation.z - t.z).abs() < 0.05, "z {} vs {}", pose.translation.z, t.z);
                let r = truth.rotation.scaled_axis();
                assert!((pose.rotation.x - r.x).abs() < 0.05);
                assert!((pose.rotation.y - r.y).abs() < 0.05);
                assert!((pose.rotation.z - r.z).abs() < 0.05);
            }

            state = render_step(&mut renderer, state, pose, &outcome.correspondences).unwrap();
        }

        assert_eq!(engine.cycles(), 10);
        assert_eq!(state.frames, 10);
        assert!(state.pose.is_some(), "no pose solved in 10 cycles");
        assert_eq!(renderer.live_poses(), 1);
    }

    /// Outlier hits are rejected by the consensus solver
    #[tokio::test]
    async fn test_e2e_simulated_with_outliers() {
        let mut source = simulator(SimulatedSettings {
            noise_ticks: 5.0,
            outlier_rate: 0.1,
            ..SimulatedSettings::default()
        });
        let layout = source.layout().clone();
        // Tight enough that a random hit almost never lands inside it
        let solver = RansacPnpSolver::new(&SolverSettings {
            reprojection_threshold: 0.05,
            ..SolverSettings::default()
        });
        let mut engine = PoseEngine::new(layout, SweepCalibration::default(), solver);

        let mut solved = 0;
        for _ in 0..10 {
            let sample = source
                .poll_angles(Station::A, Duration::from_millis(1000))
                .await
                .unwrap();
            if let Ok(pose) = engine.process(&sample).pose {
                let truth = source.last_ground_truth().unwrap();
                assert!((pose.translation.z - truth.translation.vector.z).abs() < 0.1);
                solved += 1;
            }
        }
        assert!(solved > 0);
    }

    /// Recorded samples replay into the same correspondences
    #[tokio::test]
    async fn test_e2e_record_and_replay() {
        let mut source = simulator(SimulatedSettings::default());
        let mut recorded = Vec::new();
        for i in 0..3 {
            let sample = source
                .poll_angles(Station::A, Duration::from_millis(1000))
                .await
                .unwrap();
            recorded.push((sample.clone(), ReplayRecord::from_sample(i as f64 * 0.05, &sample)));
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        let lines: Vec<String> = recorded.iter().map(|(_, r)| r.to_line().unwrap()).collect();
        std::fs::write(&path, lines.join("\n")).unwrap();

        let mut replay = ReplayTracker::load(&path, ReplayConfig::default()).unwrap();
        let layout = config_loader::LayoutLoader::load_from_bytes(&replay.get_config().await.unwrap()).unwrap();
        let mut live = PoseEngine::new(source.layout().clone(), SweepCalibration::default(), RansacPnpSolver::default());
        let mut replayed = PoseEngine::new(layout, SweepCalibration::default(), RansacPnpSolver::default());

        for (sample, _) in &recorded {
            let from_file = replay
                .poll_angles(Station::A, Duration::from_millis(10))
                .await
                .unwrap();
            assert_eq!(&from_file, sample);
            assert_eq!(
                live.process(sample).correspondences,
                replayed.process(&from_file).correspondences
            );
        }

        let end = replay.poll_angles(Station::A, Duration::from_millis(10)).await;
        assert!(matches!(end, Err(contracts::ContractError::SourceExhausted { .. })));
    }
}

#[cfg(test)]
mod metrics_tests {
    use std::time::Duration;

    use contracts::{SimulatedSettings, Station, SweepCalibration, TrackingSource};
    use observability::{record_cycle_metrics, CycleRecord, CycleStatsAggregator, CycleStatus};
    use pose_engine::{PoseEngine, RansacPnpSolver};
    use tracker::SimulatedTracker;

    /// Cycle records built from engine outcomes aggregate into the exit summary
    #[tokio::test]
    async fn test_cycle_records_from_engine() {
        let mut source = SimulatedTracker::new(
            tracker::synthetic_layout().unwrap(),
            SweepCalibration::default(),
            1000,
            SimulatedSettings::default(),
        )
        .unwrap();
        let mut engine = PoseEngine::new(
            source.layout().clone(),
            SweepCalibration::default(),
            RansacPnpSolver::default(),
        );
        let mut aggregator = CycleStatsAggregator::new();

        for _ in 0..5 {
            let sample = source
                .poll_angles(Station::A, Duration::from_millis(1000))
                .await
                .unwrap();
            let outcome = engine.process(&sample);
            let pose = outcome.pose.as_ref().ok();
            let record = CycleRecord {
                station: Station::A,
                status: if pose.is_some() {
                    CycleStatus::Solved
                } else {
                    CycleStatus::NoPose
                },
                timed_out: false,
                sample_size: sample.len(),
                correspondences: outcome.correspondences.len(),
                poll_latency_ms: 0.5,
                solve_ms: outcome.solve_time.map(|d| d.as_secs_f64() * 1000.0),
                inliers: pose.map(|p| p.inliers),
                rms: pose.map(|p| p.rms),
            };
            record_cycle_metrics(&record);
            aggregator.update(&record);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_cycles, 5);
        assert_eq!(summary.solved + summary.no_pose, 5);
        assert!(summary.solved > 0);
        assert!(summary.to_string().contains("Tracking Summary"));
    }
}
