//! Sensor id colors (jet over the channel range)

use contracts::{ChannelId, SENSOR_COUNT};

/// Jet colormap, `t` clamped to `[0, 1]`
pub fn jet(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let channel = |center: f64| {
        let x = (1.5 - (4.0 * t - center).abs()).clamp(0.0, 1.0);
        (x * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Color for a sensor channel, stable across frames
pub fn sensor_color(channel: ChannelId) -> [u8; 3] {
    jet(channel as f64 / (SENSOR_COUNT - 1) as f64)
}
