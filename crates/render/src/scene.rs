//! Panel geometry shared by the renderers

use contracts::{SensorLayout, SweepCalibration};

/// Axis-aligned view volume of a 3D panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl PanelBounds {
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Pose panel, display frame. The station looks down -y.
pub const POSE_PANEL: PanelBounds = PanelBounds {
    min: [-0.75, -2.5, -0.75],
    max: [0.75, -1.0, 0.75],
};

/// Layout panel, object frame
pub const LAYOUT_PANEL: PanelBounds = PanelBounds {
    min: [-0.2, -0.2, -0.2],
    max: [0.2, 0.2, 0.2],
};

/// Length of drawn sensor normals (meters)
pub const NORMAL_LENGTH: f64 = 0.02;

/// Angle panel extent: `(width, height)` in degrees
pub fn angle_panel(calibration: &SweepCalibration) -> (f64, f64) {
    (calibration.horizontal.span(), calibration.vertical.span())
}

/// Normal arrows of the layout panel as `(origin, vector)` pairs
pub fn layout_arrows(layout: &SensorLayout) -> Vec<([f64; 3], [f64; 3])> {
    layout
        .iter()
        .map(|(_, record)| {
            let n = record.normal.to_array();
            (
                record.position.to_array(),
                [n[0] * NORMAL_LENGTH, n[1] * NORMAL_LENGTH, n[2] * NORMAL_LENGTH],
            )
        })
        .collect()
}

/// Frame timeline shared by all entries drawn between two `present` calls.
///
/// The first draw of a frame opens it at the next sequence number, so every
/// entry of frame N is stamped N.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    presented: i64,
    open: bool,
}

impl FrameClock {
    /// Sequence number to stamp, when this call opens a new frame
    pub fn begin(&mut self) -> Option<i64> {
        if self.open {
            return None;
        }
        self.open = true;
        Some(self.presented + 1)
    }

    /// Close the current frame and return its sequence number
    pub fn present(&mut self) -> i64 {
        self.presented += 1;
        self.open = false;
        self.presented
    }

    pub fn presented(&self) -> i64 {
        self.presented
    }
}
