//! Simulated tracker
//!
//! Implements `TrackingSource` without hardware. A ground-truth pose moves on
//! a slow Lissajous path in front of the station; every poll replays enough
//! lighthouse sweeps to collect the requested number of hits, projecting each
//! visible sensor through the synthetic sweep camera.
//!
//! Both stations share the same geometry; the station only tags the hits.

use std::time::Duration;

use bytes::Bytes;
use contracts::{
    AngleSample, CameraIntrinsics, ContractError, SensorLayout, SimulatedSettings, Station,
    SweepAxis, SweepCalibration, SweepHit, TrackingSource,
};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, trace};

use crate::buffer::AngleBuffer;

/// Lighthouse timer rate
pub const TICKS_PER_SECOND: u64 = 48_000_000;

/// One rotor sweep at 120 Hz
pub const SWEEP_PERIOD_TICKS: u64 = TICKS_PER_SECOND / 120;

/// Hard stop for sweeps per poll when few sensors are visible
const MAX_SWEEPS_PER_POLL: usize = 128;

/// Snapshot window: the last two sweeps of each axis
const WINDOW_TICKS: u64 = 4 * SWEEP_PERIOD_TICKS;

/// Simulated tracked device
pub struct SimulatedTracker {
    name: String,
    layout: SensorLayout,
    config_blob: Bytes,
    calibration: SweepCalibration,
    intrinsics: CameraIntrinsics,
    settings: SimulatedSettings,
    buffer: AngleBuffer,
    samples: usize,
    rng: StdRng,
    clock: u64,
    polls: u64,
    last_truth: Option<Isometry3<f64>>,
}

impl SimulatedTracker {
    /// Create a simulator for `layout`.
    ///
    /// `samples` is the number of raw hits gathered per poll.
    pub fn new(
        layout: SensorLayout,
        calibration: SweepCalibration,
        samples: usize,
        settings: SimulatedSettings,
    ) -> Result<Self, ContractError> {
        let config_blob = Bytes::from(config_loader::LayoutLoader::to_json(
            &layout,
            Some("SIM-LHR-0000"),
        )?);
        Ok(Self {
            name: "simulated".to_string(),
            intrinsics: calibration.intrinsics(),
            rng: StdRng::seed_from_u64(settings.seed),
            buffer: AngleBuffer::new(samples, WINDOW_TICKS),
            layout,
            config_blob,
            calibration,
            settings,
            samples: samples.max(1),
            clock: 0,
            polls: 0,
            last_truth: None,
        })
    }

    /// Simulator over the built-in synthetic layout
    pub fn with_defaults() -> Result<Self, ContractError> {
        Self::new(
            crate::synthetic_layout()?,
            SweepCalibration::default(),
            1000,
            SimulatedSettings::default(),
        )
    }

    pub fn layout(&self) -> &SensorLayout {
        &self.layout
    }

    /// Number of polls served so far
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Object-to-station transform at poll `index`
    pub fn ground_truth(&self, index: u64) -> Isometry3<f64> {
        let t = index as f64 * 0.05;
        let translation = Vector3::new(
            0.12 * (0.9 * t).sin(),
            0.08 * (0.7 * t).cos(),
            self.settings.distance + 0.15 * (0.5 * t).sin(),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            0.3 * (0.6 * t).sin(),
            0.4 * (0.4 * t).sin(),
            0.2 * (0.8 * t).cos(),
        );
        Isometry3::from_parts(Translation3::from(translation), rotation)
    }

    /// Pose used by the most recent poll
    pub fn last_ground_truth(&self) -> Option<Isometry3<f64>> {
        self.last_truth
    }

    /// Run sweeps into the buffer and snapshot it
    fn generate_sample(&mut self, station: Station) -> AngleSample {
        let truth = self.ground_truth(self.polls);
        self.polls += 1;
        self.last_truth = Some(truth);
        self.buffer.clear();

        let mut pushed = 0usize;
        let mut sweeps = 0usize;
        while pushed < self.samples && sweeps < MAX_SWEEPS_PER_POLL {
            let axis = if sweeps % 2 == 0 {
                SweepAxis::Horizontal
            } else {
                SweepAxis::Vertical
            };
            pushed += self.sweep(station, axis, &truth);
            self.clock += SWEEP_PERIOD_TICKS;
            sweeps += 1;
        }

        let sample = self.buffer.snapshot(station);
        metrics::counter!("lighthouse_sweep_hits_total", "source" => "simulated")
            .increment(pushed as u64);
        debug!(
            source = %self.name,
            %station,
            sweeps,
            hits = pushed,
            visible = sample.len(),
            "simulated poll"
        );
        sample
    }

    /// One sweep across all visible sensors. Returns hits pushed.
    fn sweep(&mut self, station: Station, axis: SweepAxis, truth: &Isometry3<f64>) -> usize {
        let tpd = self.calibration.ticks_per_degree;
        let range = match axis {
            SweepAxis::Horizontal => self.calibration.horizontal,
            SweepAxis::Vertical => self.calibration.vertical,
        };

        let mut hits = Vec::new();
        for (channel, record) in self.layout.iter() {
            let p = record.position;
            let n = record.normal;
            let pc = truth * Point3::new(p.x, p.y, p.z);
            let nc = truth.rotation * Vector3::new(n.x, n.y, n.z);

            // Sensor must face the station
            if nc.dot(&(-pc.coords)) <= 0.0 {
                continue;
            }
            let Some(image) = self.intrinsics.project([pc.x, pc.y, pc.z]) else {
                continue;
            };
            let offset = match axis {
                SweepAxis::Horizontal => image.u,
                SweepAxis::Vertical => image.v,
            };
            if !(0.0..=range.span()).contains(&offset) {
                continue;
            }

            let ticks = if self.rng.random_bool(self.settings.outlier_rate) {
                self.rng.random_range(range.lo * tpd..range.hi * tpd)
            } else {
                (offset + range.lo) * tpd + self.settings.noise_ticks * gaussian(&mut self.rng)
            };

            trace!(channel, ?axis, ticks, "sweep hit");
            hits.push(SweepHit {
                station,
                axis,
                channel,
                ticks: ticks.max(0.0).round() as u32,
                timestamp: self.clock + (offset * 1000.0) as u64,
            });
        }

        let count = hits.len();
        for hit in hits {
            self.buffer.push(hit);
        }
        count
    }
}

/// Standard normal draw (Box-Muller)
fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

impl TrackingSource for SimulatedTracker {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "simulated_get_config", skip(self))]
    async fn get_config(&mut self) -> Result<Bytes, ContractError> {
        Ok(self.config_blob.clone())
    }

    #[instrument(name = "simulated_poll", skip(self), fields(source = %self.name))]
    async fn poll_angles(
        &mut self,
        station: Station,
        timeout: Duration,
    ) -> Result<AngleSample, ContractError> {
        if self.settings.stall {
            debug!("stall mode, poll never completes");
            std::future::pending::<()>().await;
        }
        if self.settings.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.latency_ms)).await;
        }
        Ok(self.generate_sample(station))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic_layout;

    fn quiet() -> SimulatedSettings {
        SimulatedSettings {
            noise_ticks: 0.0,
            ..SimulatedSettings::default()
        }
    }

    fn tracker(settings: SimulatedSettings) -> SimulatedTracker {
        SimulatedTracker::new(
            synthetic_layout().unwrap(),
            SweepCalibration::default(),
            1000,
            settings,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_poll_sees_front_facing_sensors() {
        let mut sim = tracker(quiet());
        let sample = sim
            .poll_angles(Station::A, Duration::from_millis(1000))
            .await
            .unwrap();
        assert!(sample.len() >= 8, "only {} visible", sample.len());
        assert!(sample.len() < 32);
        assert_eq!(sample.station, Station::A);
        assert_eq!(sim.polls(), 1);
    }

    #[tokio::test]
    async fn test_ticks_decode_to_projection() {
        let mut sim = tracker(quiet());
        let sample = sim
            .poll_angles(Station::A, Duration::from_millis(1000))
            .await
            .unwrap();
        let truth = sim.last_ground_truth().unwrap();
        let cal = SweepCalibration::default();
        let k = cal.intrinsics();

        for (channel, angles) in sample.iter() {
            let p = sim.layout().get(channel).unwrap().position;
            let pc = truth * Point3::new(p.x, p.y, p.z);
            let expected = k.project([pc.x, pc.y, pc.z]).unwrap();
            let u = angles.horizontal_ticks as f64 / cal.ticks_per_degree - cal.horizontal.lo;
            let v = angles.vertical_ticks as f64 / cal.ticks_per_degree - cal.vertical.lo;
            assert!((u - expected.u).abs() < 1e-3);
            assert!((v - expected.v).abs() < 1e-3);
        }
    }

    #[tokio::test]
    async fn test_get_config_is_device_shaped() {
        let mut sim = tracker(quiet());
        let blob = sim.get_config().await.unwrap();
        let layout = config_loader::LayoutLoader::load_from_bytes(&blob).unwrap();
        assert_eq!(&layout, sim.layout());
    }

    #[tokio::test]
    async fn test_stall_mode_never_returns() {
        let mut sim = tracker(SimulatedSettings {
            stall: true,
            ..quiet()
        });
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            sim.poll_angles(Station::A, Duration::from_millis(20)),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ground_truth_moves() {
        let sim = tracker(quiet());
        let a = sim.ground_truth(0);
        let b = sim.ground_truth(40);
        assert!((a.translation.vector - b.translation.vector).norm() > 1e-3);
        assert!(a.translation.vector.z > 1.0);
    }
}
