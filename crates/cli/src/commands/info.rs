//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SensorLayout, SweepCalibration};

use crate::cli::InfoArgs;

/// Layout info for JSON output
#[derive(Serialize)]
struct LayoutInfo {
    source: String,
    sensor_count: usize,
    bounds: BoundsInfo,
    calibration: CalibrationInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
}

#[derive(Serialize)]
struct CalibrationInfo {
    ticks_per_degree: f64,
    horizontal: [f64; 2],
    vertical: [f64; 2],
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

#[derive(Serialize)]
struct SensorInfo {
    channel: u8,
    position: [f64; 3],
    normal: [f64; 3],
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let (source, layout) = match &args.layout {
        Some(path) => {
            info!(layout = %path.display(), "Loading sensor layout");
            if !path.exists() {
                anyhow::bail!("Layout file not found: {}", path.display());
            }
            let layout = config_loader::LayoutLoader::load_from_path(path)
                .with_context(|| format!("Failed to load layout from {}", path.display()))?;
            (path.display().to_string(), layout)
        }
        None => (
            "synthetic".to_string(),
            tracker::synthetic_layout().context("Failed to build synthetic layout")?,
        ),
    };

    let info = build_layout_info(&source, &layout, &SweepCalibration::default(), args.sensors);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize layout info")?;
        println!("{}", json);
    } else {
        print_layout_info(&info);
    }

    Ok(())
}

fn build_layout_info(
    source: &str,
    layout: &SensorLayout,
    calibration: &SweepCalibration,
    with_sensors: bool,
) -> LayoutInfo {
    let (min, max) = layout.bounds();
    let k = calibration.intrinsics();

    let sensors = if with_sensors {
        layout
            .iter()
            .map(|(channel, sensor)| SensorInfo {
                channel,
                position: sensor.position.to_array(),
                normal: sensor.normal.to_array(),
            })
            .collect()
    } else {
        Vec::new()
    };

    LayoutInfo {
        source: source.to_string(),
        sensor_count: layout.len(),
        bounds: BoundsInfo {
            min: min.to_array(),
            max: max.to_array(),
        },
        calibration: CalibrationInfo {
            ticks_per_degree: calibration.ticks_per_degree,
            horizontal: [calibration.horizontal.lo, calibration.horizontal.hi],
            vertical: [calibration.vertical.lo, calibration.vertical.hi],
            fx: k.fx,
            fy: k.fy,
            cx: k.cx,
            cy: k.cy,
        },
        sensors,
    }
}

fn print_layout_info(info: &LayoutInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Lighthouse Sensor Layout                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Layout");
    println!("   ├─ Source: {}", info.source);
    println!("   ├─ Sensors: {}", info.sensor_count);
    let (min, max) = (info.bounds.min, info.bounds.max);
    println!(
        "   └─ Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
        min[0], min[1], min[2], max[0], max[1], max[2]
    );

    let cal = &info.calibration;
    println!("\n⚙️  Calibration");
    println!("   ├─ Ticks/degree: {}", cal.ticks_per_degree);
    println!(
        "   ├─ Horizontal: {} .. {} deg",
        cal.horizontal[0], cal.horizontal[1]
    );
    println!("   ├─ Vertical: {} .. {} deg", cal.vertical[0], cal.vertical[1]);
    println!(
        "   └─ Intrinsics: fx={} fy={} cx={} cy={}",
        cal.fx, cal.fy, cal.cx, cal.cy
    );

    if !info.sensors.is_empty() {
        println!("\n📡 Sensors ({})", info.sensors.len());
        for (i, sensor) in info.sensors.iter().enumerate() {
            let prefix = if i == info.sensors.len() - 1 { "└─" } else { "├─" };
            let (p, n) = (sensor.position, sensor.normal);
            println!(
                "   {} #{:<2} p=({:+.4}, {:+.4}, {:+.4}) n=({:+.3}, {:+.3}, {:+.3})",
                prefix, sensor.channel, p[0], p[1], p[2], n[0], n[1], n[2]
            );
        }
    }

    println!();
}
