//! Render step state threading
//!
//! What is on screen lives in a [`VisualizationState`] value: each
//! [`render_step`] consumes the previous state and returns the next one.

use contracts::{ContractError, Correspondences, DisplayPose, PoseEstimate, PoseHandle, Renderer};
use tracing::{instrument, trace, warn};

/// Visualization state carried between cycles
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisualizationState {
    /// Pose artifacts currently drawn; `None` before the first pose
    pub pose: Option<PoseHandle>,

    /// Pose those artifacts show
    pub displayed: Option<DisplayPose>,

    /// Frames presented
    pub frames: u64,
}

/// Draw one frame.
///
/// The angle panel is redrawn every cycle. Pose artifacts are replaced only
/// when `pose` is `Some`; otherwise the previous ones stay on screen. A
/// failed removal is logged and the stale handle dropped.
///
/// # Errors
/// Propagates renderer failures from drawing or presenting.
#[instrument(
    level = "trace",
    name = "render_step",
    skip_all,
    fields(renderer = renderer.name(), frame = state.frames, has_pose = pose.is_some())
)]
pub fn render_step<R: Renderer + ?Sized>(
    renderer: &mut R,
    state: VisualizationState,
    pose: Option<&PoseEstimate>,
    correspondences: &Correspondences,
) -> Result<VisualizationState, ContractError> {
    let mut next = state;

    renderer.draw_angles(correspondences)?;

    if let Some(pose) = pose {
        if let Some(handle) = next.pose.take() {
            if let Err(err) = renderer.remove_pose(handle) {
                metrics::counter!("lighthouse_render_errors_total", "op" => "remove_pose").increment(1);
                warn!(renderer = renderer.name(), ?handle, error = %err, "pose removal failed");
            }
        }
        let display = DisplayPose::from_estimate(pose);
        next.pose = Some(renderer.draw_pose(&display)?);
        next.displayed = Some(display);
    } else {
        trace!("no new pose, keeping previous artifacts");
    }

    renderer.present()?;
    metrics::counter!("lighthouse_render_frames_total").increment(1);
    next.frames += 1;
    Ok(next)
}
