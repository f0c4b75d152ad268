//! Tracking loop statistics.

use std::time::Duration;

use contracts::PoseEstimate;
use observability::CycleStatsAggregator;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitReason {
    /// SIGINT/SIGTERM
    #[default]
    Signal,
    /// `--max-cycles` reached
    MaxCycles,
    /// Replay recording ended
    SourceExhausted,
}

/// Statistics from one loop run
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    /// Completed cycles (poll through render)
    pub cycles: u64,

    /// Frames presented by the renderer
    pub frames: u64,

    pub duration: Duration,

    pub exit_reason: ExitReason,

    /// Last pose drawn
    pub last_pose: Option<PoseEstimate>,

    /// Per-cycle aggregator
    pub cycle_metrics: CycleStatsAggregator,
}

impl LoopStats {
    /// Cycles per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.cycles as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Cycles: {} ({:.2}/s)", self.cycles, self.rate());
        println!("Frames presented: {}", self.frames);
        println!("Exit: {:?}", self.exit_reason);
        if let Some(pose) = &self.last_pose {
            println!(
                "Last pose: t=({:.3}, {:.3}, {:.3}) r=({:.3}, {:.3}, {:.3}) inliers={}",
                pose.translation.x,
                pose.translation.y,
                pose.translation.z,
                pose.rotation.x,
                pose.rotation.y,
                pose.rotation.z,
                pose.inliers
            );
        }
        println!();
        print!("{}", self.cycle_metrics.summary());
        println!();
    }
}
