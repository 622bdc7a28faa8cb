//! Weighted random draws over probability vectors.
//!
//! Sampling is kept separate from probability storage so the stochastic
//! paths (belief resampling, exploratory action choice) can be seeded and
//! mocked in tests independently of the data structures they draw from.

use rand::Rng;

/// Draw an index from a weight slice, proportionally to the weights.
///
/// Weights need not be normalized; negative entries are treated as zero.
/// Returns `None` when the weights carry no mass.
pub fn sample_index<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        last_positive = Some(i);
        remaining -= w;
        if remaining <= 0.0 {
            return Some(i);
        }
    }
    // rounding can leave a sliver of mass; attribute it to the last carrier
    last_positive
}
