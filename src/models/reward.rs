//! Reward model construction.
//!
//! The reward of taking action `a` while the tracked point sits in voxel `i`
//! combines a repulsive-potential penalty for proximity to the point and a
//! centering term rewarding actions whose predicted outcome keeps the point
//! within view.

use nalgebra::{DMatrix, Point3};
use rayon::prelude::*;

use crate::actions::ActionSet;
use crate::engine::config::RewardConfig;
use crate::geometry::CameraIntrinsics;
use crate::grid::VoxelGrid;
use crate::motion::{MotionPredictor, RobotMotion};

/// Artificial-potential-field penalty for proximity to the tracked point.
///
/// Zero at or beyond `max_distance`; below it the penalty grows without
/// bound as the distance to the point approaches zero:
/// `0.5 * gain * (1/d - 1/max_distance)^2`.
pub fn repulsive_potential(point: &Point3<f64>, gain: f64, max_distance: f64) -> f64 {
    let dist = point.coords.norm();
    if dist >= max_distance {
        return 0.0;
    }
    0.5 * gain * (1.0 / dist - 1.0 / max_distance).powi(2)
}

/// Build the `N x M` reward matrix.
///
/// `reward(i, a) = -repulsive_potential(metric(i)) + centering_term(i, a)`
/// where the centering term is the negative weighted Manhattan offset of the
/// action-propagated point from the volume center. Predictions leaving the
/// volume take the worst in-view penalty so an out-of-view outcome is never
/// preferred over any in-view one; the absorbing source row gets the same
/// worst-case term with no repulsion.
pub fn build_reward_model(
    grid: &VoxelGrid,
    intrinsics: &CameraIntrinsics,
    predictor: &dyn MotionPredictor,
    actions: &ActionSet,
    config: &RewardConfig,
    lookahead: f64,
) -> DMatrix<f64> {
    let n = grid.num_states();
    let m = actions.len();

    let center = volume_center(grid);
    let worst = worst_offset(grid, config);

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let metric = grid
                .index_to_coordinate(i)
                .map(|c| intrinsics.pixel_to_metric(c.x, c.y, c.z));

            let repulsion = metric.as_ref().map_or(0.0, |p| {
                repulsive_potential(p, config.repulsion_gain, config.repulsion_max_distance)
            });

            actions
                .iter()
                .map(|action| {
                    let centering = match &metric {
                        Some(p) => centering_term(
                            grid, intrinsics, predictor, p, action, lookahead, &center, worst,
                            config,
                        ),
                        None => -worst,
                    };
                    -repulsion + centering
                })
                .collect()
        })
        .collect();

    let mut flat = Vec::with_capacity(n * m);
    for row in rows {
        flat.extend_from_slice(&row);
    }
    DMatrix::from_row_slice(n, m, &flat)
}

/// Pixel-space center of the sensed volume.
fn volume_center(grid: &VoxelGrid) -> Point3<f64> {
    Point3::new(
        grid.width() as f64 * grid.pixel_step() / 2.0,
        grid.height() as f64 * grid.pixel_step() / 2.0,
        (grid.min_depth() + grid.max_depth()) / 2.0,
    )
}

/// Largest weighted offset reachable inside the volume: the half extents.
fn worst_offset(grid: &VoxelGrid, config: &RewardConfig) -> f64 {
    let q = &config.centering_weights;
    q.x * grid.width() as f64 * grid.pixel_step() / 2.0
        + q.y * grid.height() as f64 * grid.pixel_step() / 2.0
        + q.z * (grid.max_depth() - grid.min_depth()) / 2.0
}

#[allow(clippy::too_many_arguments)]
fn centering_term(
    grid: &VoxelGrid,
    intrinsics: &CameraIntrinsics,
    predictor: &dyn MotionPredictor,
    metric: &Point3<f64>,
    action: &nalgebra::Vector3<f64>,
    lookahead: f64,
    center: &Point3<f64>,
    worst: f64,
    config: &RewardConfig,
) -> f64 {
    let motion = RobotMotion::from_action(action);
    let moved = predictor.propagate(metric, &motion, lookahead);
    if moved.z <= 0.0 {
        return -worst;
    }

    let pixel = intrinsics.metric_to_pixel(&moved);
    if grid.coordinate_to_index(&pixel) == grid.absorbing_index() {
        return -worst;
    }

    let q = &config.centering_weights;
    -(q.x * (pixel.x - center.x).abs()
        + q.y * (pixel.y - center.y).abs()
        + q.z * (pixel.z - center.z).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{ActionBounds, GridConfig};
    use crate::motion::ConstantVelocityEuler;
    use nalgebra::Vector3;

    #[test]
    fn test_repulsive_potential_support() {
        let gain = 2.0;
        let max = 1.5;
        // zero at and beyond the cutoff
        assert_eq!(
            repulsive_potential(&Point3::new(1.5, 0.0, 0.0), gain, max),
            0.0
        );
        assert_eq!(
            repulsive_potential(&Point3::new(0.0, 0.0, 3.0), gain, max),
            0.0
        );
        // strictly positive below it
        assert!(repulsive_potential(&Point3::new(0.0, 0.0, 1.0), gain, max) > 0.0);
    }

    #[test]
    fn test_repulsive_potential_monotone_below_cutoff() {
        let gain = 1.0;
        let max = 2.0;
        let mut last = f64::INFINITY;
        for d in [0.1, 0.25, 0.5, 1.0, 1.5, 1.9] {
            let pot = repulsive_potential(&Point3::new(0.0, 0.0, d), gain, max);
            assert!(pot < last, "potential not decreasing at distance {}", d);
            last = pot;
        }
    }

    fn small_setup() -> (VoxelGrid, CameraIntrinsics, ActionSet) {
        let grid = VoxelGrid::new(&GridConfig {
            image_width: 4,
            image_height: 4,
            pixel_step: 1.0,
            min_depth: 0.0,
            max_depth: 4.0,
            depth_step: 1.0,
        })
        .unwrap();
        let intrinsics = CameraIntrinsics::new(2.0, 2.0, 2.0, 2.0);
        let actions = ActionSet::enumerate(&ActionBounds {
            min: Vector3::new(0.0, -0.2, 0.0),
            max: Vector3::new(0.4, 0.2, 0.0),
            step: Vector3::new(0.4, 0.2, 1.0),
        });
        (grid, intrinsics, actions)
    }

    #[test]
    fn test_reward_shape_and_finiteness() {
        let (grid, intrinsics, actions) = small_setup();
        let config = RewardConfig::default();
        let model = build_reward_model(
            &grid,
            &intrinsics,
            &ConstantVelocityEuler,
            &actions,
            &config,
            0.5,
        );
        assert_eq!(model.nrows(), grid.num_states());
        assert_eq!(model.ncols(), actions.len());
        assert!(model.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_absorbing_row_is_uniform_worst_centering() {
        let (grid, intrinsics, actions) = small_setup();
        let config = RewardConfig::default();
        let model = build_reward_model(
            &grid,
            &intrinsics,
            &ConstantVelocityEuler,
            &actions,
            &config,
            0.5,
        );
        let row = model.row(grid.absorbing_index());
        let first = row[0];
        assert!(row.iter().all(|&r| (r - first).abs() < 1e-12));
        assert!(first < 0.0);
    }

    #[test]
    fn test_close_voxels_are_penalized() {
        let (grid, intrinsics, actions) = small_setup();
        let config = RewardConfig {
            repulsion_gain: 1.0,
            repulsion_max_distance: 2.0,
            centering_weights: Vector3::new(0.0, 0.0, 0.0),
        };
        let model = build_reward_model(
            &grid,
            &intrinsics,
            &ConstantVelocityEuler,
            &actions,
            &config,
            0.0,
        );
        // with centering weights zeroed only repulsion remains: the nearest
        // depth slab must score below the farthest one
        let near = 0;
        let far = grid.width() * grid.height() * (grid.depth() - 1);
        assert!(model[(near, 0)] < model[(far, 0)]);
    }
}
