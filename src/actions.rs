//! Discretized candidate control commands.
//!
//! Actions are `(vx, vy, yaw_rate)` vectors enumerated over configured bounds.
//! The enumeration order is stable and row-major over the three axes; the
//! resulting index is part of the public contract because the reward and
//! alpha matrices are indexed by it.

use nalgebra::Vector3;

use crate::engine::config::ActionBounds;

/// Ordered, immutable set of candidate actions.
#[derive(Debug, Clone)]
pub struct ActionSet {
    actions: Vec<Vector3<f64>>,
}

impl ActionSet {
    /// Enumerate the full grid product over the three axes, stepping from the
    /// minimum to the maximum bound inclusive.
    ///
    /// The outermost axis is vx, then vy, then yaw rate. Bounds are expected
    /// to have been validated ([`ActionBounds::validate`]); degenerate bounds
    /// still produce at least the minimum per axis.
    pub fn enumerate(bounds: &ActionBounds) -> Self {
        let xs = axis_values(bounds.min.x, bounds.max.x, bounds.step.x);
        let ys = axis_values(bounds.min.y, bounds.max.y, bounds.step.y);
        let ws = axis_values(bounds.min.z, bounds.max.z, bounds.step.z);

        let mut actions = Vec::with_capacity(xs.len() * ys.len() * ws.len());
        for &vx in &xs {
            for &vy in &ys {
                for &yaw in &ws {
                    actions.push(Vector3::new(vx, vy, yaw));
                }
            }
        }

        Self { actions }
    }

    /// Number of actions.
    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when the set holds no actions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action vector at the given index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Vector3<f64>> {
        self.actions.get(index)
    }

    /// Iterate over the actions in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.actions.iter()
    }

    /// All actions as a slice, in index order.
    #[inline]
    pub fn as_slice(&self) -> &[Vector3<f64>] {
        &self.actions
    }
}

/// Inclusive range of values from `min` to `max` stepped by `step`.
///
/// A small relative tolerance keeps the maximum included when the step does
/// not divide the span exactly.
fn axis_values(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut values = Vec::new();
    let tolerance = step * 1e-9;
    let mut v = min;
    while v <= max + tolerance {
        values.push(v);
        v += step;
    }
    values
}
