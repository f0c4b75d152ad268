//! TrackerSettings - Config Loader output
//!
//! Tool settings loaded from TOML/JSON. Every section has defaults so an
//! empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{CameraIntrinsics, Station};

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Sweep-angle calibration
    #[serde(default)]
    pub calibration: SweepCalibration,

    /// Device polling
    #[serde(default)]
    pub poll: PollSettings,

    /// Render cadence and backend
    #[serde(default)]
    pub render: RenderSettings,

    /// Pose solver tuning
    #[serde(default)]
    pub solver: SolverSettings,

    /// Angle data source
    #[serde(default)]
    pub source: SourceSettings,
}

/// Calibration range of one sweep axis, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub lo: f64,
    pub hi: f64,
}

impl AxisRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Angular extent of the axis
    pub fn span(&self) -> f64 {
        self.hi - self.lo
    }
}

/// Fixed lighthouse scanning geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepCalibration {
    pub ticks_per_degree: f64,

    /// Applied to the first tick value of a sample entry
    pub horizontal: AxisRange,

    /// Applied to the second tick value of a sample entry
    pub vertical: AxisRange,
}

impl SweepCalibration {
    /// Synthetic pinhole standing in for the sweep field of view.
    ///
    /// Image width and height are the angular spans of the two axes.
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::from_field_of_view(self.horizontal.span(), self.vertical.span())
    }
}

impl Default for SweepCalibration {
    fn default() -> Self {
        Self {
            ticks_per_degree: 2222.22,
            horizontal: AxisRange::new(32.0, 156.0),
            vertical: AxisRange::new(25.0, 149.0),
        }
    }
}

/// Device polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Station to poll
    #[serde(default)]
    pub station: Station,

    /// Upper bound on one poll
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Raw sweep hits gathered per poll
    #[serde(default = "default_samples")]
    pub samples: usize,
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_samples() -> usize {
    1000
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            station: Station::A,
            timeout_ms: default_timeout_ms(),
            samples: default_samples(),
        }
    }
}

/// Render backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderBackend {
    /// Structured log lines
    #[default]
    Log,
    /// Rerun viewer (requires the `rerun` feature)
    Rerun,
}

/// Render settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Pause between cycles
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    #[serde(default)]
    pub backend: RenderBackend,

    /// Application id shown by the viewer
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

fn default_frame_interval_ms() -> u64 {
    50
}

fn default_app_id() -> String {
    "lighthouse-viz".to_string()
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            backend: RenderBackend::default(),
            app_id: default_app_id(),
        }
    }
}

/// RANSAC PnP tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iters: usize,

    /// Inlier threshold on reprojection error (normalized-angle units)
    pub reprojection_threshold: f64,

    /// Desired probability of drawing one outlier-free sample
    pub confidence: f64,

    pub min_inliers: usize,

    pub seed: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iters: 100,
            reprojection_threshold: 8.0,
            confidence: 0.99,
            min_inliers: 6,
            seed: 1_234_567,
        }
    }
}

/// Where angle samples come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Synthetic tracker with a moving ground-truth pose
    #[default]
    Simulated,
    /// Recorded JSONL samples
    Replay,
}

/// Source settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub kind: SourceKind,

    /// JSONL recording (replay only)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Layout JSON served as the device config blob
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    /// Restart the recording when it ends
    #[serde(default)]
    pub loop_playback: bool,

    #[serde(default)]
    pub simulated: SimulatedSettings,
}

/// Simulated tracker knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedSettings {
    /// Gaussian tick noise (standard deviation, ticks)
    pub noise_ticks: f64,

    /// Fraction of hits replaced by random ticks
    pub outlier_rate: f64,

    /// Artificial delay per poll
    pub latency_ms: u64,

    /// Never return from a poll
    pub stall: bool,

    /// Distance from the station to the orbit center (meters)
    pub distance: f64,

    pub seed: u64,
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            noise_ticks: 20.0,
            outlier_rate: 0.0,
            latency_ms: 0,
            stall: false,
            distance: 1.6,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = TrackerSettings::default();
        assert_eq!(s.calibration.ticks_per_degree, 2222.22);
        assert_eq!(s.calibration.horizontal.span(), 124.0);
        assert_eq!(s.calibration.vertical.span(), 124.0);
        assert_eq!(s.poll.timeout_ms, 1000);
        assert_eq!(s.render.frame_interval_ms, 50);
        assert_eq!(s.source.kind, SourceKind::Simulated);
    }

    #[test]
    fn test_calibration_intrinsics() {
        let k = SweepCalibration::default().intrinsics();
        assert_eq!((k.fx, k.fy), (62.0, 62.0));
        assert_eq!((k.cx, k.cy), (61.5, 61.5));
    }

    #[test]
    fn test_empty_json_is_default() {
        let s: TrackerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, TrackerSettings::default());
    }

    #[test]
    fn test_partial_section() {
        let s: TrackerSettings =
            serde_json::from_str(r#"{"poll": {"station": "b"}, "render": {"backend": "rerun"}}"#)
                .unwrap();
        assert_eq!(s.poll.station, Station::B);
        assert_eq!(s.poll.timeout_ms, 1000);
        assert_eq!(s.render.backend, RenderBackend::Rerun);
    }
}
