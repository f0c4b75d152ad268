//! # Render
//!
//! Visualization of the tracking loop.
//!
//! Responsibilities:
//! - Thread `VisualizationState` from one render step to the next
//! - Panel geometry and sensor colors
//! - Renderer backends (log lines, Rerun viewer)

pub mod colormap;
pub mod error;
pub mod renderers;
pub mod scene;
pub mod state;

use contracts::{RenderBackend, RenderSettings, Renderer, SweepCalibration};
use tracing::instrument;

pub use contracts::{DisplayPose, PoseHandle};
pub use error::{RenderError, Result};
pub use renderers::LogRenderer;
#[cfg(feature = "rerun")]
pub use renderers::RerunRenderer;
pub use state::{render_step, VisualizationState};

/// Create the renderer selected by `settings`
#[instrument(name = "create_renderer", skip_all, fields(backend = ?settings.backend))]
pub fn create_renderer(
    settings: &RenderSettings,
    calibration: &SweepCalibration,
) -> Result<Box<dyn Renderer>> {
    match settings.backend {
        RenderBackend::Log => Ok(Box::new(LogRenderer::new(settings.app_id.clone()))),
        #[cfg(feature = "rerun")]
        RenderBackend::Rerun => Ok(Box::new(RerunRenderer::spawn(&settings.app_id, calibration)?)),
        #[cfg(not(feature = "rerun"))]
        RenderBackend::Rerun => {
            let _ = calibration;
            Err(RenderError::backend_unavailable(
                "rerun",
                "built without the `rerun` feature",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_log_renderer() {
        let renderer = create_renderer(&RenderSettings::default(), &SweepCalibration::default()).unwrap();
        assert_eq!(renderer.name(), "lighthouse-viz");
    }

    #[cfg(not(feature = "rerun"))]
    #[test]
    fn test_rerun_without_feature() {
        let settings = RenderSettings {
            backend: RenderBackend::Rerun,
            ..RenderSettings::default()
        };
        let err = create_renderer(&settings, &SweepCalibration::default()).err().unwrap();
        assert!(matches!(err, RenderError::BackendUnavailable { .. }));
    }
}
