//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use contracts::{
    PoseSolver, Renderer, SensorLayout, ShutdownToken, SourceKind, TrackerSettings, TrackingSource,
};
use pose_engine::{PoseEngine, RansacPnpSolver};
use tracker::{ReplayConfig, ReplayTracker, SimulatedTracker};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{LoopConfig, RenderLoop, SampleRecorder};

/// Execute the `run` command
pub async fn run_tracking(args: &RunArgs) -> Result<()> {
    let settings = resolve_settings(args)?;

    info!(
        source = ?settings.source.kind,
        station = %settings.poll.station,
        timeout_ms = settings.poll.timeout_ms,
        frame_interval_ms = settings.render.frame_interval_ms,
        renderer = ?settings.render.backend,
        "Settings loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    match settings.source.kind {
        SourceKind::Simulated => {
            let layout = match layout_override(&settings)? {
                Some(layout) => layout,
                None => tracker::synthetic_layout().map_err(CliError::Layout)?,
            };
            let source = SimulatedTracker::new(
                layout,
                settings.calibration,
                settings.poll.samples,
                settings.source.simulated.clone(),
            )
            .map_err(|e| CliError::source_setup("simulated", e.to_string()))?;
            run_with_source(source, args, &settings).await
        }
        SourceKind::Replay => {
            let path = settings
                .source
                .path
                .clone()
                .ok_or_else(|| CliError::source_setup("replay", "no recording path given"))?;
            let source = ReplayTracker::load(
                &path,
                ReplayConfig {
                    config_path: settings.source.config_path.clone(),
                    loop_playback: settings.source.loop_playback,
                },
            )
            .map_err(|e| CliError::source_setup("replay", e.to_string()))?;
            run_with_source(source, args, &settings).await
        }
    }
}

/// Settings file (or defaults) with CLI overrides applied, then validated
fn resolve_settings(args: &RunArgs) -> Result<TrackerSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            info!(path = %path.display(), "Loading settings");
            config_loader::ConfigLoader::load_from_path(path).map_err(|source| {
                CliError::Settings {
                    path: path.clone(),
                    source,
                }
            })?
        }
        None => TrackerSettings::default(),
    };

    if let Some(source) = args.source {
        settings.source.kind = source.into();
    }
    if let Some(path) = &args.replay {
        info!(path = %path.display(), "Replaying recording");
        settings.source.kind = SourceKind::Replay;
        settings.source.path = Some(path.clone());
    }
    if let Some(layout) = &args.layout {
        settings.source.config_path = Some(layout.clone());
    }
    if args.replay_loop {
        settings.source.loop_playback = true;
    }
    if let Some(station) = args.station {
        settings.poll.station = station.into();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.poll.timeout_ms = timeout_ms;
    }
    if let Some(interval) = args.frame_interval_ms {
        settings.render.frame_interval_ms = interval;
    }
    if let Some(renderer) = args.renderer {
        settings.render.backend = renderer.into();
    }

    config_loader::ConfigLoader::validate(&settings).context("Invalid settings after overrides")?;
    Ok(settings)
}

/// Layout file named by `source.config_path` (or `--layout`), if any
fn layout_override(settings: &TrackerSettings) -> Result<Option<SensorLayout>> {
    match &settings.source.config_path {
        Some(path) => {
            let layout =
                config_loader::LayoutLoader::load_from_path(path).map_err(CliError::Layout)?;
            info!(path = %path.display(), sensors = layout.len(), "Sensor layout loaded");
            Ok(Some(layout))
        }
        None => Ok(None),
    }
}

async fn run_with_source<S: TrackingSource>(
    mut source: S,
    args: &RunArgs,
    settings: &TrackerSettings,
) -> Result<()> {
    // INIT: a layout is required before the first poll
    let blob = source.get_config().await.map_err(CliError::Layout)?;
    let layout = config_loader::LayoutLoader::load_from_bytes(&blob).map_err(CliError::Layout)?;
    info!(source = source.name(), sensors = layout.len(), "Sensor layout ready");

    if args.dry_run {
        info!("Dry run mode - settings and layout are valid, exiting");
        print_run_summary(settings, &layout, source.name());
        return Ok(());
    }

    let solver = RansacPnpSolver::new(&settings.solver);
    let engine = PoseEngine::new(layout, settings.calibration, solver);
    let renderer = render::create_renderer(&settings.render, &settings.calibration)
        .map_err(CliError::from)?;

    let shutdown = ShutdownToken::new();
    spawn_signal_handler(shutdown.clone());

    let max_cycles = (args.max_cycles != 0).then_some(args.max_cycles);
    let config = LoopConfig::from_settings(settings, max_cycles);
    let mut render_loop = RenderLoop::new(config, source, engine, renderer, shutdown);
    if let Some(path) = &args.record {
        let recorder = SampleRecorder::create(path)
            .with_context(|| format!("Failed to create recording {}", path.display()))?;
        info!(path = %path.display(), "Recording samples");
        render_loop = render_loop.with_recorder(recorder);
    }

    run_loop(&mut render_loop).await
}

async fn run_loop<S, P, R>(render_loop: &mut RenderLoop<S, P, R>) -> Result<()>
where
    S: TrackingSource,
    P: PoseSolver,
    R: Renderer,
{
    info!("Starting tracking loop...");
    let stats = render_loop.run().await.map_err(CliError::Loop)?;

    info!(
        cycles = stats.cycles,
        frames = stats.frames,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.rate()),
        exit = ?stats.exit_reason,
        "Tracking loop completed"
    );
    stats.print_summary();
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
fn spawn_signal_handler(token: ShutdownToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        warn!("Received shutdown signal, finishing current cycle...");
        token.cancel();
    });
}

/// Print settings summary for dry-run mode
fn print_run_summary(settings: &TrackerSettings, layout: &SensorLayout, source: &str) {
    let cal = &settings.calibration;
    let (min, max) = layout.bounds();

    println!("\n=== Run Summary ===\n");
    println!("Source: {source}");
    if let Some(path) = &settings.source.path {
        println!("  Recording: {}", path.display());
        println!("  Loop: {}", settings.source.loop_playback);
    }
    println!("\nLayout: {} sensors", layout.len());
    println!(
        "  Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
        min.x, min.y, min.z, max.x, max.y, max.z
    );
    println!("\nCalibration:");
    println!("  Ticks/degree: {}", cal.ticks_per_degree);
    println!("  Horizontal: {} .. {}", cal.horizontal.lo, cal.horizontal.hi);
    println!("  Vertical: {} .. {}", cal.vertical.lo, cal.vertical.hi);
    println!("\nPolling:");
    println!("  Station: {}", settings.poll.station);
    println!("  Timeout: {} ms", settings.poll.timeout_ms);
    println!("  Samples/poll: {}", settings.poll.samples);
    println!("\nRender:");
    println!("  Backend: {:?}", settings.render.backend);
    println!("  Frame interval: {} ms", settings.render.frame_interval_ms);
    println!();
}
