//! Settings validation
//!
//! Rules:
//! - ticks_per_degree > 0
//! - each calibration range has lo < hi
//! - poll timeout and frame interval > 0
//! - solver min_inliers >= 4, 0 < confidence < 1, threshold > 0
//! - replay source has a recording path

use contracts::{
    AxisRange, ContractError, SourceKind, TrackerSettings, MIN_CORRESPONDENCES,
};

/// Validate TrackerSettings
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(settings: &TrackerSettings) -> Result<(), ContractError> {
    validate_calibration(settings)?;
    validate_timing(settings)?;
    validate_solver(settings)?;
    validate_source(settings)?;
    Ok(())
}

fn validate_calibration(settings: &TrackerSettings) -> Result<(), ContractError> {
    let cal = &settings.calibration;
    if !(cal.ticks_per_degree > 0.0) {
        return Err(ContractError::config_validation(
            "calibration.ticks_per_degree",
            format!("ticks_per_degree must be > 0, got {}", cal.ticks_per_degree),
        ));
    }
    validate_range("calibration.horizontal", &cal.horizontal)?;
    validate_range("calibration.vertical", &cal.vertical)?;
    Ok(())
}

fn validate_range(field: &str, range: &AxisRange) -> Result<(), ContractError> {
    if !(range.lo < range.hi) {
        return Err(ContractError::config_validation(
            field,
            format!("lo ({}) must be < hi ({})", range.lo, range.hi),
        ));
    }
    Ok(())
}

fn validate_timing(settings: &TrackerSettings) -> Result<(), ContractError> {
    if settings.poll.timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "poll.timeout_ms",
            "timeout_ms must be > 0",
        ));
    }
    if settings.poll.samples == 0 {
        return Err(ContractError::config_validation(
            "poll.samples",
            "samples must be > 0",
        ));
    }
    if settings.render.frame_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "render.frame_interval_ms",
            "frame_interval_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_solver(settings: &TrackerSettings) -> Result<(), ContractError> {
    let solver = &settings.solver;
    if solver.min_inliers < MIN_CORRESPONDENCES {
        return Err(ContractError::config_validation(
            "solver.min_inliers",
            format!(
                "min_inliers must be >= {MIN_CORRESPONDENCES}, got {}",
                solver.min_inliers
            ),
        ));
    }
    if !(solver.confidence > 0.0 && solver.confidence < 1.0) {
        return Err(ContractError::config_validation(
            "solver.confidence",
            format!("confidence must be in (0, 1), got {}", solver.confidence),
        ));
    }
    if !(solver.reprojection_threshold > 0.0) {
        return Err(ContractError::config_validation(
            "solver.reprojection_threshold",
            format!(
                "reprojection_threshold must be > 0, got {}",
                solver.reprojection_threshold
            ),
        ));
    }
    if solver.max_iters == 0 {
        return Err(ContractError::config_validation(
            "solver.max_iters",
            "max_iters must be > 0",
        ));
    }
    Ok(())
}

fn validate_source(settings: &TrackerSettings) -> Result<(), ContractError> {
    let source = &settings.source;
    if source.kind == SourceKind::Replay && source.path.is_none() {
        return Err(ContractError::config_validation(
            "source.path",
            "replay source requires a recording path",
        ));
    }
    let rate = source.simulated.outlier_rate;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ContractError::config_validation(
            "source.simulated.outlier_rate",
            format!("outlier_rate must be in [0, 1], got {rate}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&TrackerSettings::default()).is_ok());
    }

    #[test]
    fn test_ticks_per_degree() {
        let mut s = TrackerSettings::default();
        s.calibration.ticks_per_degree = 0.0;
        assert_eq!(field_of(validate(&s).unwrap_err()), "calibration.ticks_per_degree");

        s.calibration.ticks_per_degree = f64::NAN;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn test_inverted_range() {
        let mut s = TrackerSettings::default();
        s.calibration.vertical = AxisRange::new(149.0, 25.0);
        assert_eq!(field_of(validate(&s).unwrap_err()), "calibration.vertical");
    }

    #[test]
    fn test_zero_timeout_and_interval() {
        let mut s = TrackerSettings::default();
        s.poll.timeout_ms = 0;
        assert_eq!(field_of(validate(&s).unwrap_err()), "poll.timeout_ms");

        let mut s = TrackerSettings::default();
        s.render.frame_interval_ms = 0;
        assert_eq!(field_of(validate(&s).unwrap_err()), "render.frame_interval_ms");
    }

    #[test]
    fn test_solver_bounds() {
        let mut s = TrackerSettings::default();
        s.solver.min_inliers = 3;
        assert_eq!(field_of(validate(&s).unwrap_err()), "solver.min_inliers");

        let mut s = TrackerSettings::default();
        s.solver.confidence = 1.0;
        assert_eq!(field_of(validate(&s).unwrap_err()), "solver.confidence");

        let mut s = TrackerSettings::default();
        s.solver.reprojection_threshold = -1.0;
        assert_eq!(field_of(validate(&s).unwrap_err()), "solver.reprojection_threshold");
    }

    #[test]
    fn test_replay_requires_path() {
        let mut s = TrackerSettings::default();
        s.source.kind = SourceKind::Replay;
        assert_eq!(field_of(validate(&s).unwrap_err()), "source.path");

        s.source.path = Some("session.jsonl".into());
        assert!(validate(&s).is_ok());
    }
}
