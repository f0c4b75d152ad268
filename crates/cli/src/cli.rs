//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::{RenderBackend, SourceKind, Station};

/// lighthouse-viz - lighthouse sweep angles to object pose
#[derive(Parser, Debug)]
#[command(
    name = "lighthouse-viz",
    author,
    version,
    about = "Lighthouse pose reconstruction with a live debugging view",
    long_about = "Polls lighthouse sweep angles from a tracked object, pairs them with the \n\
                  object's sensor layout, solves for its pose and renders the pose, the \n\
                  station-angle scatter and the layout until interrupted."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LIGHTHOUSE_VIZ_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "LIGHTHOUSE_VIZ_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter used when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tracking loop until interrupted
    Run(RunArgs),

    /// Validate a sensor layout file without running
    Validate(ValidateArgs),

    /// Display sensor layout information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Settings file (TOML or JSON); built-in defaults when absent
    #[arg(short, long, env = "LIGHTHOUSE_VIZ_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Sensor layout JSON to use instead of the device's config blob
    #[arg(short, long, env = "LIGHTHOUSE_VIZ_LAYOUT")]
    pub layout: Option<PathBuf>,

    /// Angle data source
    #[arg(long, value_enum, env = "LIGHTHOUSE_VIZ_SOURCE")]
    pub source: Option<SourceArg>,

    /// JSONL recording to replay (implies `--source replay`)
    #[arg(long, env = "LIGHTHOUSE_VIZ_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Restart the recording when it ends
    #[arg(long)]
    pub replay_loop: bool,

    /// Write every polled sample to this JSONL file
    #[arg(long, env = "LIGHTHOUSE_VIZ_RECORD")]
    pub record: Option<PathBuf>,

    /// Lighthouse station to poll
    #[arg(long, value_enum, env = "LIGHTHOUSE_VIZ_STATION")]
    pub station: Option<StationArg>,

    /// Upper bound on one device poll (ms)
    #[arg(long, env = "LIGHTHOUSE_VIZ_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Pause between cycles (ms)
    #[arg(long, env = "LIGHTHOUSE_VIZ_FRAME_INTERVAL_MS")]
    pub frame_interval_ms: Option<u64>,

    /// Stop after this many cycles (0 = until interrupted)
    #[arg(long, default_value = "0", env = "LIGHTHOUSE_VIZ_MAX_CYCLES")]
    pub max_cycles: u64,

    /// Visualization backend
    #[arg(long, value_enum, env = "LIGHTHOUSE_VIZ_RENDERER")]
    pub renderer: Option<RendererArg>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LIGHTHOUSE_VIZ_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate settings and layout, then exit without polling
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Sensor layout JSON (device config blob format)
    #[arg(short, long, default_value = "config.json")]
    pub layout: PathBuf,

    /// Settings file to validate as well
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Sensor layout JSON; the built-in synthetic layout when absent
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every sensor's position and normal
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SourceArg {
    /// Synthetic tracker with a moving ground truth
    Simulated,
    /// JSONL recording
    Replay,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Simulated => Self::Simulated,
            SourceArg::Replay => Self::Replay,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StationArg {
    A,
    B,
}

impl From<StationArg> for Station {
    fn from(arg: StationArg) -> Self {
        match arg {
            StationArg::A => Self::A,
            StationArg::B => Self::B,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RendererArg {
    /// Structured log lines
    Log,
    /// Rerun viewer (built with `--features rerun`)
    Rerun,
}

impl From<RendererArg> for RenderBackend {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Log => Self::Log,
            RendererArg::Rerun => Self::Rerun,
        }
    }
}
