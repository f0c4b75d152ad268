//! Tracking pipeline: the render loop and its helpers.

mod recorder;
mod render_loop;
mod stats;

pub use recorder::SampleRecorder;
pub use render_loop::{LoopConfig, RenderLoop};
pub use stats::LoopStats;
