//! # Pose Engine
//!
//! Turns angle samples into pose estimates.
//!
//! - Angle normalization (ticks to image-plane degrees)
//! - Correspondence building against the sensor layout
//! - EPnP + RANSAC solver behind the `PoseSolver` contract
//!
//! ## Usage
//!
//! ```ignore
//! use pose_engine::{PoseEngine, RansacPnpSolver};
//!
//! let solver = RansacPnpSolver::new(&settings.solver);
//! let mut engine = PoseEngine::new(layout, settings.calibration, solver);
//!
//! let outcome = engine.process(&sample);
//! if let Ok(pose) = outcome.pose {
//!     // draw it
//! }
//! ```

mod correspondence;
mod engine;
mod normalizer;
pub mod solver;

pub use correspondence::{ensure_solvable, CorrespondenceBuilder};
pub use engine::{CycleOutcome, PoseEngine};
pub use normalizer::{normalize, AngleNormalizer};
pub use solver::{PnpError, RansacPnpSolver};
