//! # Tracker
//!
//! Angle data sources.
//!
//! Responsibilities:
//! - Buffer raw sweep hits and reduce them to `AngleSample`s
//! - Provide `TrackingSource` implementations for simulation and replay
//! - Provide a synthetic 32-sensor layout for running without hardware

pub mod buffer;
pub mod error;
pub mod layout;
pub mod replay;
pub mod simulated;

pub use buffer::AngleBuffer;
pub use contracts::{AngleSample, TrackingSource};
pub use error::{Result, TrackerError};
pub use layout::synthetic_layout;
pub use replay::{ReplayConfig, ReplayRecord, ReplayTracker};
pub use simulated::SimulatedTracker;
