//! Transition model construction.
//!
//! Row `i` of the transition matrix is the distribution over the tracked
//! point's next voxel given it currently sits in voxel `i` and the robot
//! keeps the supplied motion for one lookahead interval. Each row is a
//! truncated Gaussian around the deterministically predicted next voxel,
//! with mass draining to the absorbing state when the prediction leaves the
//! volume.

use log::warn;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::geometry::CameraIntrinsics;
use crate::grid::VoxelGrid;
use crate::motion::{MotionPredictor, RobotMotion};

use super::normal_pdf;

/// Build the `N x N` row-stochastic transition matrix.
///
/// For every voxel the center is back-projected to the metric frame,
/// propagated by `predictor` under `motion` for `lookahead` seconds,
/// re-projected, and voxelized; the row is then the normalized Gaussian
/// weight `normal_pdf(distance(predicted, j), 0, sdev)` over all states `j`.
/// The absorbing state predicts itself.
///
/// Rows whose weights sum to zero fall back to uniform and log a warning;
/// every returned row sums to 1.
pub fn build_transition_model(
    grid: &VoxelGrid,
    intrinsics: &CameraIntrinsics,
    predictor: &dyn MotionPredictor,
    motion: &RobotMotion,
    lookahead: f64,
    sdev: f64,
) -> DMatrix<f64> {
    let n = grid.num_states();

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let predicted = predicted_index(grid, intrinsics, predictor, motion, lookahead, i);
            gaussian_row(grid, predicted, sdev, i)
        })
        .collect();

    let mut flat = Vec::with_capacity(n * n);
    for row in rows {
        flat.extend_from_slice(&row);
    }
    DMatrix::from_row_slice(n, n, &flat)
}

/// Deterministic next voxel for the point currently centered in voxel `i`.
fn predicted_index(
    grid: &VoxelGrid,
    intrinsics: &CameraIntrinsics,
    predictor: &dyn MotionPredictor,
    motion: &RobotMotion,
    lookahead: f64,
    i: usize,
) -> usize {
    let center = match grid.index_to_coordinate(i) {
        Some(center) => center,
        // a point already out of range stays out of range
        None => return grid.absorbing_index(),
    };

    let metric = intrinsics.pixel_to_metric(center.x, center.y, center.z);
    let moved = predictor.propagate(&metric, motion, lookahead);
    if moved.z <= 0.0 {
        return grid.absorbing_index();
    }
    grid.coordinate_to_index(&intrinsics.metric_to_pixel(&moved))
}

/// Normalized Gaussian weights around `predicted` over all states.
fn gaussian_row(grid: &VoxelGrid, predicted: usize, sdev: f64, source: usize) -> Vec<f64> {
    let n = grid.num_states();
    let mut row: Vec<f64> = (0..n)
        .map(|j| normal_pdf(grid.distance(predicted, j), 0.0, sdev))
        .collect();

    let sum: f64 = row.iter().sum();
    if sum <= f64::MIN_POSITIVE {
        warn!(
            "transition row {} degenerate (predicted state {}), falling back to uniform",
            source, predicted
        );
        let uniform = 1.0 / n as f64;
        row.iter_mut().for_each(|w| *w = uniform);
        return row;
    }

    row.iter_mut().for_each(|w| *w /= sum);
    row
}
