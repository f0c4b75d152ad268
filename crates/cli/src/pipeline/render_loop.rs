//! Render loop - poll, solve and draw at a fixed cadence.
//!
//! `INIT -> POLLING <-> RENDERING -> SHUTDOWN`. The shutdown token is only
//! checked at the top of an iteration, so a started cycle always completes.

use std::time::{Duration, Instant};

use contracts::{
    AngleSample, ContractError, PoseSolver, Renderer, ShutdownToken, Station, TrackerSettings,
    TrackingSource,
};
use observability::{record_cycle_metrics, record_render_error, CycleRecord, CycleStatus};
use pose_engine::PoseEngine;
use render::{render_step, VisualizationState};
use tracing::{debug, info, instrument, warn};

use super::recorder::SampleRecorder;
use super::stats::{ExitReason, LoopStats};

/// Loop timing and limits
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub station: Station,
    pub poll_timeout: Duration,
    pub frame_interval: Duration,
    /// `None` runs until interrupted
    pub max_cycles: Option<u64>,
}

impl LoopConfig {
    pub fn from_settings(settings: &TrackerSettings, max_cycles: Option<u64>) -> Self {
        Self {
            station: settings.poll.station,
            poll_timeout: Duration::from_millis(settings.poll.timeout_ms),
            frame_interval: Duration::from_millis(settings.render.frame_interval_ms),
            max_cycles,
        }
    }
}

/// Loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Polling,
    Rendering,
    Shutdown,
}

/// What a poll produced
enum Polled {
    Sample { sample: AngleSample, timed_out: bool },
    Failed(ContractError),
    Exhausted,
}

pub struct RenderLoop<S, P, R> {
    config: LoopConfig,
    source: S,
    engine: PoseEngine<P>,
    renderer: R,
    shutdown: ShutdownToken,
    recorder: Option<SampleRecorder>,
    state: LoopState,
}

impl<S, P, R> RenderLoop<S, P, R>
where
    S: TrackingSource,
    P: PoseSolver,
    R: Renderer,
{
    pub fn new(
        config: LoopConfig,
        source: S,
        engine: PoseEngine<P>,
        renderer: R,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            config,
            source,
            engine,
            renderer,
            shutdown,
            recorder: None,
            state: LoopState::Init,
        }
    }

    /// Write every polled sample to `recorder`
    pub fn with_recorder(mut self, recorder: SampleRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run until shutdown, `max_cycles`, or source exhaustion.
    ///
    /// # Errors
    /// Only non-recoverable source errors end the loop with an error.
    #[instrument(
        name = "render_loop",
        skip(self),
        fields(source = self.source.name(), renderer = self.renderer.name(), station = %self.config.station)
    )]
    pub async fn run(&mut self) -> Result<LoopStats, ContractError> {
        let start = Instant::now();
        let mut stats = LoopStats::default();
        let mut vis = VisualizationState::default();

        self.state = LoopState::Init;
        if let Err(e) = self.renderer.draw_layout(self.engine.layout()) {
            warn!(error = %e, "layout panel failed");
            record_render_error(self.renderer.name());
            stats.cycle_metrics.record_render_error();
        }
        info!(
            sensors = self.engine.layout().len(),
            timeout_ms = self.config.poll_timeout.as_millis() as u64,
            frame_interval_ms = self.config.frame_interval.as_millis() as u64,
            max_cycles = ?self.config.max_cycles,
            "render loop started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                info!(cycles = stats.cycles, "shutdown requested");
                stats.exit_reason = ExitReason::Signal;
                break;
            }
            if self.config.max_cycles.is_some_and(|max| stats.cycles >= max) {
                info!(cycles = stats.cycles, "reached max cycles");
                stats.exit_reason = ExitReason::MaxCycles;
                break;
            }

            self.state = LoopState::Polling;
            let poll_start = Instant::now();
            let polled = self.poll().await;
            let poll_latency_ms = poll_start.elapsed().as_secs_f64() * 1000.0;

            let (sample, timed_out) = match polled {
                Polled::Sample { sample, timed_out } => (sample, timed_out),
                Polled::Exhausted => {
                    info!(cycles = stats.cycles, "source exhausted");
                    stats.exit_reason = ExitReason::SourceExhausted;
                    break;
                }
                Polled::Failed(e) if e.is_recoverable() => {
                    warn!(error = %e, "poll failed, skipping cycle");
                    let record = CycleRecord {
                        station: self.config.station,
                        status: CycleStatus::DeviceError,
                        timed_out: false,
                        sample_size: 0,
                        correspondences: 0,
                        poll_latency_ms,
                        solve_ms: None,
                        inliers: None,
                        rms: None,
                    };
                    record_cycle_metrics(&record);
                    stats.cycle_metrics.update(&record);
                    stats.cycles += 1;
                    tokio::time::sleep(self.config.frame_interval).await;
                    continue;
                }
                Polled::Failed(e) => {
                    self.state = LoopState::Shutdown;
                    return Err(e);
                }
            };

            if let Some(recorder) = self.recorder.as_mut() {
                if let Err(e) = recorder.record(&sample) {
                    warn!(error = %e, "sample recording failed, recording stopped");
                    self.recorder = None;
                }
            }

            self.state = LoopState::Rendering;
            let outcome = self.engine.process(&sample);
            let status = match &outcome.pose {
                Ok(_) => CycleStatus::Solved,
                Err(ContractError::NoPoseFound { .. }) => CycleStatus::NoPose,
                Err(_) => CycleStatus::Insufficient,
            };
            if let Err(e) = &outcome.pose {
                debug!(reason = %e, "pose not updated");
            }
            let pose = outcome.pose.as_ref().ok();

            match render_step(&mut self.renderer, vis, pose, &outcome.correspondences) {
                Ok(next) => vis = next,
                Err(e) => {
                    warn!(error = %e, "render step failed");
                    record_render_error(self.renderer.name());
                    stats.cycle_metrics.record_render_error();
                }
            }
            if let Some(pose) = pose {
                stats.last_pose = Some(*pose);
            }

            let record = CycleRecord {
                station: self.config.station,
                status,
                timed_out,
                sample_size: sample.len(),
                correspondences: outcome.correspondences.len(),
                poll_latency_ms,
                solve_ms: outcome.solve_time.map(|d| d.as_secs_f64() * 1000.0),
                inliers: pose.map(|p| p.inliers),
                rms: pose.map(|p| p.rms),
            };
            record_cycle_metrics(&record);
            stats.cycle_metrics.update(&record);
            stats.cycles += 1;

            tokio::time::sleep(self.config.frame_interval).await;
        }

        self.state = LoopState::Shutdown;
        if let Some(recorder) = self.recorder.take() {
            match recorder.finish() {
                Ok(written) => info!(samples = written, "recording closed"),
                Err(e) => warn!(error = %e, "failed to flush recording"),
            }
        }

        stats.frames = vis.frames;
        stats.duration = start.elapsed();
        info!(
            cycles = stats.cycles,
            frames = stats.frames,
            duration_secs = stats.duration.as_secs_f64(),
            "render loop stopped"
        );
        Ok(stats)
    }

    /// One bounded poll. A timeout is an empty sample.
    async fn poll(&mut self) -> Polled {
        let station = self.config.station;
        let timeout = self.config.poll_timeout;
        match tokio::time::timeout(timeout, self.source.poll_angles(station, timeout)).await {
            Ok(Ok(sample)) => Polled::Sample {
                sample,
                timed_out: false,
            },
            Ok(Err(ContractError::SourceExhausted { .. })) => Polled::Exhausted,
            Ok(Err(ContractError::DeviceTimeout { timeout_ms })) => {
                debug!(timeout_ms, "source reported timeout");
                Polled::Sample {
                    sample: AngleSample::empty(station),
                    timed_out: true,
                }
            }
            Ok(Err(e)) => Polled::Failed(e),
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "poll timed out");
                Polled::Sample {
                    sample: AngleSample::empty(station),
                    timed_out: true,
                }
            }
        }
    }
}
