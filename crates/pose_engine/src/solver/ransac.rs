//! Seeded consensus search over minimal samples.
//!
//! Each round fits a [`SampleModel`] to a random minimal sample, refits it
//! on every point within the threshold and keeps the hypothesis with the
//! most support. The round budget shrinks as the best inlier ratio grows.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Knobs of [`ransac`]
#[derive(Debug, Clone, PartialEq)]
pub struct RansacOptions {
    /// Hard cap on sampling rounds
    pub max_iters: usize,
    /// Largest residual still counted as support
    pub thresh: f64,
    /// Hypotheses with less support are discarded
    pub min_inliers: usize,
    /// Wanted probability that one round drew only inliers
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            thresh: 8.0,
            min_inliers: 6,
            confidence: 0.99,
            seed: 1_234_567,
        }
    }
}

/// Best hypothesis found, if any
#[derive(Debug, Clone)]
pub struct Consensus<M> {
    pub model: Option<M>,
    /// Indices into the input data, ascending
    pub inliers: Vec<usize>,
    /// RMS residual over `inliers`
    pub rms: f64,
    /// Round that produced `model`
    pub round: usize,
}

impl<M> Consensus<M> {
    pub fn none() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            rms: f64::INFINITY,
            round: 0,
        }
    }

    pub fn is_found(&self) -> bool {
        self.model.is_some()
    }

    /// More support wins, lower RMS breaks ties
    fn is_beaten_by(&self, inliers: usize, rms: f64) -> bool {
        match self.model {
            None => true,
            Some(_) => {
                inliers > self.inliers.len() || (inliers == self.inliers.len() && rms < self.rms)
            }
        }
    }
}

/// A model [`ransac`] can hypothesize and score
pub trait SampleModel {
    type Datum;
    type Model;

    /// Points per minimal sample
    const SAMPLE_SIZE: usize;

    /// Fit the minimal sample at `indices`; `None` when degenerate
    fn fit_sample(&self, data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model>;

    /// Fit every point at `indices`
    fn fit_all(&self, data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative error of `datum` under `model`, in threshold units
    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> f64;
}

pub(crate) fn rms(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return f64::INFINITY;
    }
    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
}

/// Rounds needed to draw one all-inlier sample with `confidence`
fn rounds_needed(confidence: f64, inlier_ratio: f64, sample_size: usize) -> Option<usize> {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return None;
    }
    let miss = (1.0 - inlier_ratio.powi(sample_size as i32)).max(1e-12).ln();
    (miss < 0.0).then(|| ((1.0 - confidence).ln() / miss).ceil() as usize)
}

/// Support of `model`: inlier indices and their residuals
fn support<S: SampleModel>(
    model: &S::Model,
    estimator: &S,
    data: &[S::Datum],
    thresh: f64,
) -> (Vec<usize>, Vec<f64>) {
    data.iter()
        .enumerate()
        .map(|(i, datum)| (i, estimator.residual(model, datum)))
        .filter(|&(_, r)| r <= thresh)
        .unzip()
}

/// Search `data` for the model with the widest support
pub fn ransac<S: SampleModel>(
    estimator: &S,
    data: &[S::Datum],
    opts: &RansacOptions,
) -> Consensus<S::Model> {
    let mut best = Consensus::none();
    if data.len() < S::SAMPLE_SIZE {
        return best;
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut budget = opts.max_iters;
    let mut round = 0;

    while round < budget {
        round += 1;
        let sample = index::sample(&mut rng, data.len(), S::SAMPLE_SIZE).into_vec();
        let Some(seed_model) = estimator.fit_sample(data, &sample) else {
            continue;
        };

        let (seed_inliers, _) = support(&seed_model, estimator, data, opts.thresh);
        if seed_inliers.len() < opts.min_inliers {
            continue;
        }
        let Some(model) = estimator.fit_all(data, &seed_inliers) else {
            continue;
        };
        let (inliers, residuals) = support(&model, estimator, data, opts.thresh);
        if inliers.len() < opts.min_inliers {
            continue;
        }

        let fit_rms = rms(&residuals);
        if best.is_beaten_by(inliers.len(), fit_rms) {
            let ratio = inliers.len() as f64 / data.len() as f64;
            if let Some(needed) = rounds_needed(opts.confidence, ratio, S::SAMPLE_SIZE) {
                budget = needed.clamp(round, opts.max_iters);
            }
            best = Consensus {
                model: Some(model),
                inliers,
                rms: fit_rms,
                round,
            };
        }
    }

    best
}
