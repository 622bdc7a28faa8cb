//! Belief distribution over the voxel states and its per-cycle updates.
//!
//! The belief is a probability vector of length `N`: non-negative entries
//! summing to 1, an invariant every operation here preserves. Each sensing
//! cycle runs one predict step through the transition model and one correct
//! step against the observed per-voxel point counts.

use log::warn;
use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::engine::config::{ExpectedCount, NoiseConfig};
use crate::engine::errors::TrackerError;
use crate::models::normal_pdf;
use crate::sampling::sample_index;

/// Threshold below which a normalizing sum counts as "no evidence".
const EVIDENCE_FLOOR: f64 = 1e-300;

/// Probability distribution over voxel occupancy.
#[derive(Debug, Clone, PartialEq)]
pub struct Belief {
    probabilities: DVector<f64>,
}

impl Belief {
    /// Uniform distribution over `n` states.
    pub fn uniform(n: usize) -> Self {
        Self {
            probabilities: DVector::from_element(n, 1.0 / n as f64),
        }
    }

    /// Wrap an existing distribution, renormalizing it.
    ///
    /// Fails when the vector is empty, carries a negative or non-finite
    /// entry, or has no mass at all.
    pub fn from_distribution(probabilities: DVector<f64>) -> Result<Self, TrackerError> {
        if probabilities.is_empty() {
            return Err(TrackerError::Configuration {
                description: "belief vector must not be empty".to_string(),
            });
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(TrackerError::Configuration {
                description: "belief entries must be finite and non-negative".to_string(),
            });
        }
        let sum: f64 = probabilities.sum();
        if sum <= EVIDENCE_FLOOR {
            return Err(TrackerError::Configuration {
                description: "belief vector carries no mass".to_string(),
            });
        }
        Ok(Self {
            probabilities: probabilities / sum,
        })
    }

    /// Number of states.
    #[inline]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// True when the distribution has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// The probability vector.
    #[inline]
    pub fn probabilities(&self) -> &DVector<f64> {
        &self.probabilities
    }

    /// Probabilities as a plain slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.probabilities.as_slice()
    }

    /// Index of the most probable state, lowest index on ties.
    pub fn dominant(&self) -> usize {
        let mut best = 0;
        let mut best_p = self.probabilities[0];
        for (i, &p) in self.probabilities.iter().enumerate().skip(1) {
            if p > best_p {
                best = i;
                best_p = p;
            }
        }
        best
    }

    /// Predict step: propagate the belief one interval through the
    /// transition model (`belief' = belief * T`, row vector times matrix).
    pub fn predict(&mut self, transition: &DMatrix<f64>) {
        debug_assert_eq!(transition.nrows(), self.len());
        self.probabilities = transition.tr_mul(&self.probabilities);
        self.renormalize();
    }

    /// Correct step: fold elementwise observation weights into the belief.
    ///
    /// When the weights extinguish all mass the predicted belief is kept
    /// unchanged rather than dividing by zero, and a warning is logged.
    pub fn correct(&mut self, weights: &DVector<f64>) {
        debug_assert_eq!(weights.len(), self.len());
        let posterior = self.probabilities.component_mul(weights);
        let sum = posterior.sum();
        if sum <= EVIDENCE_FLOOR || !sum.is_finite() {
            warn!("observation weights carry no evidence, keeping predicted belief");
            return;
        }
        self.probabilities = posterior / sum;
    }

    /// Particle-style resampling: redraw `samples` states from the current
    /// belief, weighting each draw by the observation weight at the drawn
    /// state, and replace the belief with the normalized histogram.
    ///
    /// Falls back to the unchanged belief when the draws carry no weight.
    /// The plain [`Belief::correct`] update is the default cycle path; this
    /// exists for hosts that prefer redraw variance over exact reweighting.
    pub fn resample<R: Rng>(&mut self, weights: &DVector<f64>, samples: usize, rng: &mut R) {
        debug_assert_eq!(weights.len(), self.len());
        let mut histogram: DVector<f64> = DVector::zeros(self.len());
        for _ in 0..samples {
            if let Some(state) = sample_index(self.as_slice(), rng) {
                histogram[state] += weights[state].max(0.0);
            }
        }
        let sum = histogram.sum();
        if sum <= EVIDENCE_FLOOR || !sum.is_finite() {
            warn!("resampling drew no weighted particles, keeping prior belief");
            return;
        }
        self.probabilities = histogram / sum;
    }

    fn renormalize(&mut self) {
        let sum = self.probabilities.sum();
        if sum > EVIDENCE_FLOOR && sum.is_finite() {
            self.probabilities /= sum;
        } else {
            warn!("belief mass degenerated, resetting to uniform");
            let n = self.len();
            self.probabilities.fill(1.0 / n as f64);
        }
    }
}

/// Observation likelihood per state from the per-voxel point counts.
///
/// Each state's weight is the normal density of its count around the
/// expected count. With the adaptive expectation the cycle's maximum count
/// serves as the target, so an empty cloud yields equal weights everywhere
/// and the correction becomes a no-op.
pub fn count_likelihood(counts: &[usize], noise: &NoiseConfig) -> DVector<f64> {
    let expected = match noise.expected_count {
        ExpectedCount::Fixed(value) => value,
        ExpectedCount::Adaptive => counts.iter().copied().max().unwrap_or(0) as f64,
    };
    DVector::from_iterator(
        counts.len(),
        counts
            .iter()
            .map(|&c| normal_pdf(c as f64, expected, noise.observation_sdev)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_sums_to_one(belief: &Belief) {
        assert!((belief.probabilities().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_construction() {
        let belief = Belief::uniform(9);
        assert_eq!(belief.len(), 9);
        assert_sums_to_one(&belief);
        assert!((belief.probabilities()[0] - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_distribution_normalizes() {
        let belief = Belief::from_distribution(DVector::from_vec(vec![2.0, 2.0])).unwrap();
        assert!((belief.probabilities()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_from_distribution_rejects_invalid() {
        assert!(Belief::from_distribution(DVector::from_vec(vec![])).is_err());
        assert!(Belief::from_distribution(DVector::from_vec(vec![1.0, -0.5])).is_err());
        assert!(Belief::from_distribution(DVector::from_vec(vec![0.0, 0.0])).is_err());
        assert!(Belief::from_distribution(DVector::from_vec(vec![f64::NAN, 1.0])).is_err());
    }

    #[test]
    fn test_predict_preserves_distribution() {
        let n = 4;
        let mut belief = Belief::uniform(n);
        // a permutation transition: i -> i+1 mod n
        let mut t = DMatrix::zeros(n, n);
        for i in 0..n {
            t[(i, (i + 1) % n)] = 1.0;
        }
        belief.predict(&t);
        assert_sums_to_one(&belief);
    }

    #[test]
    fn test_predict_moves_mass_along_transition() {
        let n = 3;
        let mut belief =
            Belief::from_distribution(DVector::from_vec(vec![1.0, 0.0, 0.0])).unwrap();
        let t = DMatrix::from_row_slice(
            n,
            n,
            &[0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        );
        belief.predict(&t);
        assert!((belief.probabilities()[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correct_concentrates_on_evidence() {
        let mut belief = Belief::uniform(3);
        belief.correct(&DVector::from_vec(vec![0.0, 1.0, 0.0]));
        assert_sums_to_one(&belief);
        assert!((belief.probabilities()[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correct_with_zero_evidence_keeps_prediction() {
        let mut belief =
            Belief::from_distribution(DVector::from_vec(vec![0.25, 0.75])).unwrap();
        let before = belief.clone();
        belief.correct(&DVector::from_vec(vec![0.0, 0.0]));
        assert_eq!(belief, before);
        assert_sums_to_one(&belief);
    }

    #[test]
    fn test_dominant_breaks_ties_low() {
        let belief =
            Belief::from_distribution(DVector::from_vec(vec![0.4, 0.4, 0.2])).unwrap();
        assert_eq!(belief.dominant(), 0);
    }

    #[test]
    fn test_resample_preserves_distribution() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut belief = Belief::uniform(5);
        let weights = DVector::from_vec(vec![0.1, 0.1, 5.0, 0.1, 0.1]);
        belief.resample(&weights, 2000, &mut rng);
        assert_sums_to_one(&belief);
        assert_eq!(belief.dominant(), 2);
    }

    #[test]
    fn test_count_likelihood_adaptive_peaks_at_max() {
        let noise = NoiseConfig {
            transition_sdev: 1.0,
            observation_sdev: 5.0,
            expected_count: ExpectedCount::Adaptive,
        };
        let weights = count_likelihood(&[0, 100, 3], &noise);
        assert!(weights[1] > weights[0]);
        assert!(weights[1] > weights[2]);
    }

    #[test]
    fn test_count_likelihood_empty_counts_are_flat() {
        let noise = NoiseConfig {
            transition_sdev: 1.0,
            observation_sdev: 5.0,
            expected_count: ExpectedCount::Adaptive,
        };
        let weights = count_likelihood(&[0, 0, 0, 0], &noise);
        let first = weights[0];
        assert!(weights.iter().all(|&w| (w - first).abs() < 1e-15));
    }
}
