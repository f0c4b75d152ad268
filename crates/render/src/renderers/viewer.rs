//! RerunRenderer - three panels in a spawned Rerun viewer
//!
//! Entity trees: `pose` (current estimate), `angles` (2D scatter colored by
//! sensor id) and `layout` (static sensor positions with normals).

use contracts::{
    ContractError, Correspondences, DisplayPose, PoseHandle, Renderer, SensorLayout,
    SweepCalibration,
};
use rerun::{RecordingStream, RecordingStreamBuilder};
use tracing::{info, instrument, trace};

use crate::colormap::sensor_color;
use crate::error::{RenderError, Result};
use crate::scene::{angle_panel, layout_arrows, FrameClock, PanelBounds, LAYOUT_PANEL, POSE_PANEL};

/// Length of the drawn rotation-vector arrow per radian
const ROTATION_ARROW_SCALE: f32 = 0.25;

pub struct RerunRenderer {
    name: String,
    rec: RecordingStream,
    live: Option<PoseHandle>,
    next_handle: u64,
    clock: FrameClock,
}

fn f32x3(v: [f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

impl RerunRenderer {
    /// Spawn a viewer and log the static panel frames
    pub fn spawn(app_id: &str, calibration: &SweepCalibration) -> Result<Self> {
        let rec = RecordingStreamBuilder::new(app_id)
            .spawn()
            .map_err(|e| RenderError::backend_unavailable("rerun", e.to_string()))?;

        let renderer = Self {
            name: "rerun".to_string(),
            rec,
            live: None,
            next_handle: 0,
            clock: FrameClock::default(),
        };
        renderer.log_static_frames(calibration)?;
        info!(app_id, "rerun viewer spawned");
        Ok(renderer)
    }

    /// Stamp the draws that follow with the frame they belong to
    fn begin_frame(&mut self) {
        if let Some(seq) = self.clock.begin() {
            self.rec.set_time_sequence("frame", seq);
        }
    }

    fn err(&self, e: impl std::fmt::Display) -> ContractError {
        ContractError::render(&self.name, e.to_string())
    }

    fn log_bounds(&self, path: &str, bounds: &PanelBounds) -> std::result::Result<(), ContractError> {
        self.rec
            .log_static(
                path,
                &rerun::Boxes3D::from_mins_and_sizes([f32x3(bounds.min)], [f32x3(bounds.size())])
                    .with_colors([[90, 90, 90, 255]]),
            )
            .map_err(|e| self.err(e))
    }

    fn log_static_frames(&self, calibration: &SweepCalibration) -> std::result::Result<(), ContractError> {
        for root in ["pose", "layout"] {
            self.rec
                .log_static(root, &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())
                .map_err(|e| self.err(e))?;
        }
        self.log_bounds("pose/bounds", &POSE_PANEL)?;
        self.log_bounds("layout/bounds", &LAYOUT_PANEL)?;

        let (width, height) = angle_panel(calibration);
        self.rec
            .log_static(
                "angles/frame",
                &rerun::Boxes2D::from_mins_and_sizes([[0.0, 0.0]], [[width as f32, height as f32]]),
            )
            .map_err(|e| self.err(e))
    }
}

impl Renderer for RerunRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "rerun_renderer_layout", skip_all)]
    fn draw_layout(&mut self, layout: &SensorLayout) -> std::result::Result<(), ContractError> {
        let arrows = layout_arrows(layout);
        let colors: Vec<rerun::Color> = layout
            .iter()
            .map(|(id, _)| {
                let [r, g, b] = sensor_color(id);
                rerun::Color::from_rgb(r, g, b)
            })
            .collect();

        self.rec
            .log_static(
                "layout/sensors",
                &rerun::Points3D::new(arrows.iter().map(|(o, _)| f32x3(*o)))
                    .with_colors(colors.clone())
                    .with_radii([0.004]),
            )
            .map_err(|e| self.err(e))?;
        self.rec
            .log_static(
                "layout/normals",
                &rerun::Arrows3D::from_vectors(arrows.iter().map(|(_, v)| f32x3(*v)))
                    .with_origins(arrows.iter().map(|(o, _)| f32x3(*o)))
                    .with_colors(colors),
            )
            .map_err(|e| self.err(e))
    }

    fn draw_angles(&mut self, points: &Correspondences) -> std::result::Result<(), ContractError> {
        self.begin_frame();
        let positions = points
            .image_points
            .iter()
            .map(|p| [p.u as f32, p.v as f32]);
        let colors = points.channels.iter().map(|&id| {
            let [r, g, b] = sensor_color(id);
            rerun::Color::from_rgb(r, g, b)
        });
        self.rec
            .log(
                "angles/points",
                &rerun::Points2D::new(positions)
                    .with_colors(colors)
                    .with_radii([1.0]),
            )
            .map_err(|e| self.err(e))
    }

    fn draw_pose(&mut self, pose: &DisplayPose) -> std::result::Result<PoseHandle, ContractError> {
        self.begin_frame();
        let origin = f32x3(pose.translation);
        let r = f32x3(pose.rotation);
        self.rec
            .log(
                "pose/current/position",
                &rerun::Points3D::new([origin]).with_radii([0.02]),
            )
            .map_err(|e| self.err(e))?;
        self.rec
            .log(
                "pose/current/rotation",
                &rerun::Arrows3D::from_vectors([[
                    r[0] * ROTATION_ARROW_SCALE,
                    r[1] * ROTATION_ARROW_SCALE,
                    r[2] * ROTATION_ARROW_SCALE,
                ]])
                .with_origins([origin])
                .with_colors([[255, 200, 0, 255]]),
            )
            .map_err(|e| self.err(e))?;

        let handle = PoseHandle(self.next_handle);
        self.next_handle += 1;
        self.live = Some(handle);
        Ok(handle)
    }

    fn remove_pose(&mut self, handle: PoseHandle) -> std::result::Result<(), ContractError> {
        if self.live != Some(handle) {
            return Err(self.err(format!("unknown pose handle {}", handle.0)));
        }
        self.begin_frame();
        self.rec
            .log("pose/current", &rerun::Clear::recursive())
            .map_err(|e| self.err(e))?;
        self.live = None;
        Ok(())
    }

    fn present(&mut self) -> std::result::Result<(), ContractError> {
        let frame = self.clock.present();
        trace!(frame, "frame presented");
        Ok(())
    }
}
