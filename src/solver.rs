//! Offline QMDP value iteration.
//!
//! Solves the fully observed MDP defined by the transition and reward
//! matrices, producing the alpha matrix scored online against the belief.
//! This is a pure function of its inputs with no dependency on live sensor
//! state, so it can be run, cached, and tested independently of the cycle.

use log::info;
use nalgebra::{DMatrix, DVector};

use crate::engine::errors::TrackerError;

/// Run `iterations` synchronous Bellman sweeps and return the `N x M` alpha
/// matrix.
///
/// Each sweep applies `alpha <- reward + discount * T * max_a'(alpha)`. The
/// transition model already encodes the tracked point's own motion rather
/// than the robot's choice, so the state transition is held fixed across
/// actions and the sweeps propagate reward influence through the boundary
/// structure. Convergence is by iteration count, not tolerance; callers
/// needing tighter values choose a larger count.
pub fn solve(
    transition: &DMatrix<f64>,
    reward: &DMatrix<f64>,
    iterations: usize,
    discount: f64,
) -> Result<DMatrix<f64>, TrackerError> {
    let n = transition.nrows();
    if transition.ncols() != n {
        return Err(TrackerError::DimensionMismatch {
            expected: n,
            actual: transition.ncols(),
            context: "transition matrix columns".to_string(),
        });
    }
    if reward.nrows() != n {
        return Err(TrackerError::DimensionMismatch {
            expected: n,
            actual: reward.nrows(),
            context: "reward matrix rows".to_string(),
        });
    }
    if !(0.0..1.0).contains(&discount) {
        return Err(TrackerError::Configuration {
            description: format!("discount factor {} outside [0, 1)", discount),
        });
    }

    let m = reward.ncols();
    let mut alpha = reward.clone();
    let mut best = DVector::zeros(n);

    for sweep in 0..iterations {
        // state values under the greedy policy of the current alpha
        for i in 0..n {
            let mut max = f64::NEG_INFINITY;
            for a in 0..m {
                let v = alpha[(i, a)];
                if v > max {
                    max = v;
                }
            }
            best[i] = max;
        }

        let future = transition * &best;
        for a in 0..m {
            for i in 0..n {
                alpha[(i, a)] = reward[(i, a)] + discount * future[i];
            }
        }

        if sweep + 1 == iterations {
            info!("value iteration complete after {} sweeps", iterations);
        }
    }

    Ok(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_transition(n: usize) -> DMatrix<f64> {
        DMatrix::from_element(n, n, 1.0 / n as f64)
    }

    #[test]
    fn test_zero_iterations_returns_reward() {
        let t = uniform_transition(3);
        let r = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.5, 0.5, 0.0, 1.0]);
        let alpha = solve(&t, &r, 0, 0.9).unwrap();
        assert_eq!(alpha, r);
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let t = uniform_transition(3);
        let r = DMatrix::from_element(4, 2, 0.0);
        assert!(solve(&t, &r, 5, 0.9).is_err());

        let bad_t = DMatrix::from_element(3, 4, 0.25);
        let r = DMatrix::from_element(3, 2, 0.0);
        assert!(solve(&bad_t, &r, 5, 0.9).is_err());
    }

    #[test]
    fn test_rejects_bad_discount() {
        let t = uniform_transition(2);
        let r = DMatrix::from_element(2, 2, 0.0);
        assert!(solve(&t, &r, 5, 1.0).is_err());
        assert!(solve(&t, &r, 5, -0.1).is_err());
    }

    #[test]
    fn test_absorbing_chain_accumulates_discounted_reward() {
        // two states, the second absorbing with reward 1 under both actions
        let t = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]);
        let r = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let discount = 0.5;
        let alpha = solve(&t, &r, 50, discount).unwrap();

        // geometric series: state 1 value -> 1 / (1 - discount) = 2
        assert!((alpha[(1, 0)] - 2.0).abs() < 1e-9);
        // state 0 leads into it one step later: discount * 2 = 1
        assert!((alpha[(0, 0)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_ordering_respects_reward_ordering() {
        let t = uniform_transition(3);
        let r = DMatrix::from_row_slice(3, 2, &[2.0, 0.0, 2.0, 0.0, 2.0, 0.0]);
        let alpha = solve(&t, &r, 30, 0.9).unwrap();
        for i in 0..3 {
            assert!(alpha[(i, 0)] > alpha[(i, 1)]);
        }
    }
}
