//! Correspondence builder
//!
//! Joins an [`AngleSample`] with the [`SensorLayout`] on channel id.

use contracts::{AngleSample, ContractError, Correspondences, SensorLayout, MIN_CORRESPONDENCES};
use tracing::warn;

use crate::normalizer::AngleNormalizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrespondenceBuilder {
    normalizer: AngleNormalizer,
}

impl CorrespondenceBuilder {
    pub fn new(normalizer: AngleNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &AngleNormalizer {
        &self.normalizer
    }

    /// Pair every sample entry with its sensor, ascending by channel.
    ///
    /// Channels the layout does not know are skipped.
    pub fn collect(&self, sample: &AngleSample, layout: &SensorLayout) -> Correspondences {
        let mut out = Correspondences::with_capacity(sample.len());
        for (channel, angles) in sample.iter() {
            let Some(record) = layout.get(channel) else {
                warn!(channel, sensors = layout.len(), "channel outside layout, skipped");
                continue;
            };
            out.push(channel, self.normalizer.normalize_pair(angles), record.position);
        }
        out
    }

    /// Like [`collect`](Self::collect), but fails below the solver minimum
    pub fn build(
        &self,
        sample: &AngleSample,
        layout: &SensorLayout,
    ) -> Result<Correspondences, ContractError> {
        let set = self.collect(sample, layout);
        ensure_solvable(&set)?;
        Ok(set)
    }
}

/// Fails when `set` is below the solver minimum
pub fn ensure_solvable(set: &Correspondences) -> Result<(), ContractError> {
    if set.len() < MIN_CORRESPONDENCES {
        return Err(ContractError::InsufficientCorrespondences {
            found: set.len(),
            required: MIN_CORRESPONDENCES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Station, SENSOR_COUNT};

    fn layout() -> SensorLayout {
        let points: Vec<[f64; 3]> = (0..SENSOR_COUNT)
            .map(|i| [i as f64 * 0.01, 0.0, -(i as f64) * 0.02])
            .collect();
        let normals = vec![[0.0, 0.0, 1.0]; SENSOR_COUNT];
        SensorLayout::from_arrays(&points, &normals).unwrap()
    }

    #[test]
    fn test_reference_sample_pairs_channels() {
        let layout = layout();
        let sample = AngleSample::from_pairs(Station::A, [(5, (200_000, 150_000)), (0, (71_111, 55_555))]);
        let builder = CorrespondenceBuilder::default();

        let set = builder.collect(&sample, &layout);
        assert_eq!(set.channels, vec![0, 5]);
        assert!(set.image_points[0].u.abs() < 1e-3);
        assert!((set.image_points[1].u - 58.0).abs() < 1e-3);
        assert!((set.image_points[1].v - 42.5).abs() < 1e-3);
        assert_eq!(set.object_points[0], layout.get(0).unwrap().position);
        assert_eq!(set.object_points[1], layout.get(5).unwrap().position);

        let err = builder.build(&sample, &layout).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InsufficientCorrespondences { found: 2, required: 4 }
        ));
    }

    #[test]
    fn test_lengths_always_aligned_and_bounded() {
        let layout = layout();
        let builder = CorrespondenceBuilder::default();
        for n in [0usize, 1, 3, 4, 17, 32, 40] {
            let sample = AngleSample::from_pairs(
                Station::A,
                (0..n).map(|i| ((i * 7 % 64) as u8, (100_000 + i as u32, 90_000))),
            );
            let set = builder.collect(&sample, &layout);
            assert_eq!(set.image_points.len(), set.object_points.len());
            assert_eq!(set.channels.len(), set.object_points.len());
            assert!(set.len() <= SENSOR_COUNT);
            assert!(set.len() <= sample.len());
        }
    }

    #[test]
    fn test_unknown_channels_skipped() {
        let layout = layout();
        let sample = AngleSample::from_pairs(
            Station::B,
            [(1, (1, 1)), (2, (2, 2)), (3, (3, 3)), (40, (4, 4)), (200, (5, 5))],
        );
        let builder = CorrespondenceBuilder::default();
        assert_eq!(builder.collect(&sample, &layout).channels, vec![1, 2, 3]);
        assert!(builder.build(&sample, &layout).is_err());
    }

    #[test]
    fn test_build_accepts_four() {
        let layout = layout();
        let sample = AngleSample::from_pairs(Station::A, (0..4).map(|i| (i, (80_000, 70_000))));
        let set = CorrespondenceBuilder::default().build(&sample, &layout).unwrap();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_ensure_solvable_counts_paired_entries_only() {
        let layout = layout();
        let sample = AngleSample::from_pairs(
            Station::A,
            [(0, (1, 1)), (1, (2, 2)), (2, (3, 3)), (33, (4, 4)), (41, (5, 5))],
        );
        let set = CorrespondenceBuilder::default().collect(&sample, &layout);
        assert_eq!(sample.len(), 5);
        assert!(matches!(
            ensure_solvable(&set),
            Err(ContractError::InsufficientCorrespondences { found: 3, required: 4 })
        ));
        assert!(ensure_solvable(&Correspondences::default()).is_err());
    }
}
