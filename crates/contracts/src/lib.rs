//! # Contracts
//!
//! Frozen interface contracts shared by the lighthouse-viz crates.
//! All business crates depend only on this crate, reverse dependencies are prohibited.
//!
//! ## Units
//! - Sweep timings are raw timer ticks; `ticks_per_degree` converts to degrees
//! - Image-plane points are degrees from the calibration range origin
//! - Layout positions are meters in the object frame

mod angles;
mod error;
mod layout;
mod pose;
mod renderer;
mod runtime;
mod settings;
mod tracking_source;

pub use angles::*;
pub use error::*;
pub use layout::*;
pub use pose::*;
pub use renderer::*;
pub use runtime::*;
pub use settings::*;
pub use tracking_source::{LocalTrackingSource, TrackingSource};
