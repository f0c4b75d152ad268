//! Renderer implementations
//!
//! LogRenderer is always available; RerunRenderer needs the `rerun` feature.

mod log;
#[cfg(feature = "rerun")]
mod viewer;

pub use self::log::LogRenderer;
#[cfg(feature = "rerun")]
pub use self::viewer::RerunRenderer;
