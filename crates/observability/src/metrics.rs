//! Tracking loop metrics
//!
//! Per-cycle metrics derived from a [`CycleRecord`], plus an in-memory
//! aggregator for the summary printed on exit.

use contracts::Station;
use metrics::{counter, gauge, histogram};

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStatus {
    /// Pose solved and drawn
    Solved,
    /// Fewer than four correspondences, solver skipped
    Insufficient,
    /// Solver ran without a consensus pose
    NoPose,
    /// Source failed this cycle
    DeviceError,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Solved => "solved",
            CycleStatus::Insufficient => "insufficient",
            CycleStatus::NoPose => "no_pose",
            CycleStatus::DeviceError => "device_error",
        }
    }
}

/// What one cycle saw
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub station: Station,
    pub status: CycleStatus,
    /// Poll ran into its timeout (sample treated as empty)
    pub timed_out: bool,
    /// Entries in the polled sample
    pub sample_size: usize,
    pub correspondences: usize,
    pub poll_latency_ms: f64,
    /// Solver wall time; `None` when the solver was not invoked
    pub solve_ms: Option<f64>,
    pub inliers: Option<usize>,
    pub rms: Option<f64>,
}

/// Record metrics for one cycle
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_cycle_metrics;
///
/// let record = stats.finish_cycle(...);
/// record_cycle_metrics(&record);
/// ```
pub fn record_cycle_metrics(record: &CycleRecord) {
    let station = record.station.to_string();

    counter!(
        "lighthouse_cycles_total",
        "station" => station.clone(),
        "status" => record.status.as_str()
    )
    .increment(1);

    if record.timed_out {
        counter!("lighthouse_poll_timeouts_total", "station" => station.clone()).increment(1);
    }

    histogram!("lighthouse_poll_latency_ms", "station" => station.clone())
        .record(record.poll_latency_ms);
    gauge!("lighthouse_visible_sensors", "station" => station.clone())
        .set(record.sample_size as f64);

    if let Some(ms) = record.solve_ms {
        histogram!("lighthouse_solve_ms").record(ms);
    }
    if let Some(inliers) = record.inliers {
        gauge!("lighthouse_inliers", "station" => station).set(inliers as f64);
    }
    if let Some(rms) = record.rms {
        histogram!("lighthouse_reprojection_rms").record(rms);
    }
}

/// Record a renderer failure
pub fn record_render_error(renderer: &str) {
    counter!("lighthouse_render_failures_total", "renderer" => renderer.to_string()).increment(1);
}

/// Cycle metrics aggregator
///
/// Aggregates in memory for the exit summary.
#[derive(Debug, Clone, Default)]
pub struct CycleStatsAggregator {
    pub total_cycles: u64,
    pub solved: u64,
    pub insufficient: u64,
    pub no_pose: u64,
    pub device_errors: u64,
    pub timeouts: u64,
    pub render_errors: u64,

    pub poll_latency_ms: RunningStats,
    pub solve_ms: RunningStats,
    pub correspondences: RunningStats,
    pub rms: RunningStats,
}

impl CycleStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &CycleRecord) {
        self.total_cycles += 1;
        match record.status {
            CycleStatus::Solved => self.solved += 1,
            CycleStatus::Insufficient => self.insufficient += 1,
            CycleStatus::NoPose => self.no_pose += 1,
            CycleStatus::DeviceError => self.device_errors += 1,
        }
        if record.timed_out {
            self.timeouts += 1;
        }

        self.poll_latency_ms.push(record.poll_latency_ms);
        self.correspondences.push(record.correspondences as f64);
        if let Some(ms) = record.solve_ms {
            self.solve_ms.push(ms);
        }
        if let Some(rms) = record.rms {
            self.rms.push(rms);
        }
    }

    pub fn record_render_error(&mut self) {
        self.render_errors += 1;
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            total_cycles: self.total_cycles,
            solved: self.solved,
            insufficient: self.insufficient,
            no_pose: self.no_pose,
            device_errors: self.device_errors,
            timeouts: self.timeouts,
            render_errors: self.render_errors,
            solve_rate: if self.total_cycles > 0 {
                self.solved as f64 / self.total_cycles as f64 * 100.0
            } else {
                0.0
            },
            poll_latency_ms: StatsSummary::from(&self.poll_latency_ms),
            solve_ms: StatsSummary::from(&self.solve_ms),
            correspondences: StatsSummary::from(&self.correspondences),
            rms: StatsSummary::from(&self.rms),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Exit summary
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub total_cycles: u64,
    pub solved: u64,
    pub insufficient: u64,
    pub no_pose: u64,
    pub device_errors: u64,
    pub timeouts: u64,
    pub render_errors: u64,
    pub solve_rate: f64,
    pub poll_latency_ms: StatsSummary,
    pub solve_ms: StatsSummary,
    pub correspondences: StatsSummary,
    pub rms: StatsSummary,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Tracking Summary ===")?;
        writeln!(f, "Total cycles: {}", self.total_cycles)?;
        writeln!(f, "Poses solved: {} ({:.2}%)", self.solved, self.solve_rate)?;
        writeln!(f, "Insufficient correspondences: {}", self.insufficient)?;
        writeln!(f, "No pose found: {}", self.no_pose)?;
        writeln!(f, "Poll timeouts: {}", self.timeouts)?;
        if self.device_errors > 0 {
            writeln!(f, "Device errors: {}", self.device_errors)?;
        }
        if self.render_errors > 0 {
            writeln!(f, "Render errors: {}", self.render_errors)?;
        }
        writeln!(f, "Poll latency (ms): {}", self.poll_latency_ms)?;
        writeln!(f, "Solve time (ms): {}", self.solve_ms)?;
        writeln!(f, "Correspondences: {}", self.correspondences)?;
        writeln!(f, "Reprojection RMS: {}", self.rms)?;
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: CycleStatus) -> CycleRecord {
        CycleRecord {
            station: Station::A,
            status,
            timed_out: false,
            sample_size: 12,
            correspondences: 12,
            poll_latency_ms: 8.0,
            solve_ms: Some(0.4),
            inliers: Some(11),
            rms: Some(0.2),
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_statuses() {
        let mut aggregator = CycleStatsAggregator::new();
        aggregator.update(&record(CycleStatus::Solved));
        aggregator.update(&record(CycleStatus::Solved));
        aggregator.update(&CycleRecord {
            timed_out: true,
            sample_size: 0,
            correspondences: 0,
            solve_ms: None,
            inliers: None,
            rms: None,
            ..record(CycleStatus::Insufficient)
        });
        aggregator.update(&record(CycleStatus::NoPose));

        assert_eq!(aggregator.total_cycles, 4);
        assert_eq!(aggregator.solved, 2);
        assert_eq!(aggregator.insufficient, 1);
        assert_eq!(aggregator.no_pose, 1);
        assert_eq!(aggregator.timeouts, 1);
        assert_eq!(aggregator.solve_ms.count(), 3);

        let summary = aggregator.summary();
        assert!((summary.solve_rate - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CycleStatsAggregator::new();
        aggregator.update(&record(CycleStatus::Solved));
        aggregator.record_render_error();

        let output = aggregator.summary().to_string();
        assert!(output.contains("Total cycles: 1"));
        assert!(output.contains("100.00%"));
        assert!(output.contains("Render errors: 1"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = CycleStatsAggregator::new().summary();
        assert_eq!(summary.solve_rate, 0.0);
        assert_eq!(summary.rms.to_string(), "N/A");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_cycle_metrics(&record(CycleStatus::Solved));
        record_render_error("log");
    }
}
