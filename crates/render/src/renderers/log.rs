//! LogRenderer - renders frames as structured log lines

use std::collections::HashSet;

use contracts::{ContractError, Correspondences, DisplayPose, PoseHandle, Renderer, SensorLayout};
use tracing::{debug, info, instrument};

use crate::colormap::sensor_color;
use crate::scene::{layout_arrows, LAYOUT_PANEL, POSE_PANEL};

/// Renderer that logs every panel update, for headless runs
pub struct LogRenderer {
    name: String,
    next_handle: u64,
    live: HashSet<PoseHandle>,
    removals: u64,
    frames: u64,
}

impl LogRenderer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_handle: 0,
            live: HashSet::new(),
            removals: 0,
            frames: 0,
        }
    }

    /// Pose artifacts currently drawn
    pub fn live_poses(&self) -> usize {
        self.live.len()
    }

    /// Successful removals so far
    pub fn removals(&self) -> u64 {
        self.removals
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_renderer_layout", skip_all, fields(renderer = %self.name))]
    fn draw_layout(&mut self, layout: &SensorLayout) -> Result<(), ContractError> {
        let arrows = layout_arrows(layout);
        let outside = arrows
            .iter()
            .filter(|(origin, _)| !LAYOUT_PANEL.contains(*origin))
            .count();
        let (min, max) = layout.bounds();
        info!(
            renderer = %self.name,
            sensors = layout.len(),
            outside_view = outside,
            min = ?min.to_array(),
            max = ?max.to_array(),
            "layout panel"
        );
        Ok(())
    }

    fn draw_angles(&mut self, points: &Correspondences) -> Result<(), ContractError> {
        debug!(
            renderer = %self.name,
            points = points.len(),
            channels = ?points.channels,
            "angle panel"
        );
        for (channel, p) in points.channels.iter().zip(&points.image_points) {
            let color = sensor_color(*channel);
            tracing::trace!(channel, u = p.u, v = p.v, ?color, "angle point");
        }
        Ok(())
    }

    #[instrument(name = "log_renderer_pose", skip_all, fields(renderer = %self.name))]
    fn draw_pose(&mut self, pose: &DisplayPose) -> Result<PoseHandle, ContractError> {
        let handle = PoseHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle);

        info!(
            renderer = %self.name,
            handle = handle.0,
            x = pose.translation[0],
            y = pose.translation[1],
            z = pose.translation[2],
            rotation = ?pose.rotation,
            in_view = POSE_PANEL.contains(pose.translation),
            "pose panel"
        );
        Ok(handle)
    }

    fn remove_pose(&mut self, handle: PoseHandle) -> Result<(), ContractError> {
        if !self.live.remove(&handle) {
            return Err(ContractError::render(
                &self.name,
                format!("unknown pose handle {}", handle.0),
            ));
        }
        self.removals += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<(), ContractError> {
        self.frames += 1;
        Ok(())
    }
}
