//! Angle normalizer
//!
//! Raw sweep ticks to image-plane coordinates. The first tick value of a
//! sample entry is horizontal, the second vertical. Values outside the
//! calibrated window pass through unclamped.

use contracts::{AxisRange, ImagePoint, SweepAngles, SweepCalibration};

/// `ticks / ticks_per_degree - range.lo`
pub fn normalize(ticks: f64, ticks_per_degree: f64, range: AxisRange) -> f64 {
    ticks / ticks_per_degree - range.lo
}

/// Converts sample entries using a fixed calibration
#[derive(Debug, Clone, Copy, Default)]
pub struct AngleNormalizer {
    calibration: SweepCalibration,
}

impl AngleNormalizer {
    pub fn new(calibration: SweepCalibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &SweepCalibration {
        &self.calibration
    }

    pub fn horizontal(&self, ticks: u32) -> f64 {
        normalize(
            ticks as f64,
            self.calibration.ticks_per_degree,
            self.calibration.horizontal,
        )
    }

    pub fn vertical(&self, ticks: u32) -> f64 {
        normalize(
            ticks as f64,
            self.calibration.ticks_per_degree,
            self.calibration.vertical,
        )
    }

    pub fn normalize_pair(&self, angles: SweepAngles) -> ImagePoint {
        ImagePoint::new(
            self.horizontal(angles.horizontal_ticks),
            self.vertical(angles.vertical_ticks),
        )
    }
}
