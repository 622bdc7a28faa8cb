//! Feature extraction from raw point clouds.
//!
//! Each cycle the incoming cloud is reduced to the observation the belief
//! update consumes: a per-voxel point count, a pivot point for downstream
//! consumers, and an outlier tally for non-finite input. Extraction is total
//! over any input and never panics.

use nalgebra::Point3;

use crate::geometry::CameraIntrinsics;
use crate::grid::VoxelGrid;

/// Per-cycle observation derived from one point cloud.
#[derive(Debug, Clone)]
pub struct Observation {
    counts: Vec<usize>,
    pivot: Option<Point3<f64>>,
    outliers: usize,
    valid_points: usize,
}

impl Observation {
    /// Reduce a metric-frame point cloud to per-voxel counts.
    ///
    /// Valid points (all coordinates finite) are projected to pixel space
    /// and voxelized; points behind the sensor or outside the volume land in
    /// the absorbing state. Non-finite points are excluded and counted as
    /// outliers. The pivot is the valid point nearest the sensor.
    pub fn extract(
        cloud: &[Point3<f64>],
        grid: &VoxelGrid,
        intrinsics: &CameraIntrinsics,
    ) -> Self {
        let mut counts = vec![0usize; grid.num_states()];
        let mut outliers = 0;
        let mut valid_points = 0;
        let mut pivot: Option<Point3<f64>> = None;
        let mut pivot_range = f64::INFINITY;

        for point in cloud {
            if !is_valid(point) {
                outliers += 1;
                continue;
            }
            valid_points += 1;

            let index = if point.z <= 0.0 {
                // behind the sensor, unprojectable
                grid.absorbing_index()
            } else {
                grid.coordinate_to_index(&intrinsics.metric_to_pixel(point))
            };
            counts[index] += 1;

            let range = point.coords.norm();
            if range < pivot_range {
                pivot_range = range;
                pivot = Some(*point);
            }
        }

        Self {
            counts,
            pivot,
            outliers,
            valid_points,
        }
    }

    /// Point counts per state, length `N`.
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Count at one state.
    #[inline]
    pub fn count(&self, index: usize) -> usize {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// The valid point nearest the sensor, if any point was valid.
    #[inline]
    pub fn pivot(&self) -> Option<Point3<f64>> {
        self.pivot
    }

    /// Number of excluded non-finite points.
    #[inline]
    pub fn outliers(&self) -> usize {
        self.outliers
    }

    /// Number of points that entered the counts.
    #[inline]
    pub fn valid_points(&self) -> usize {
        self.valid_points
    }
}

#[inline]
fn is_valid(point: &Point3<f64>) -> bool {
    point.x.is_finite() && point.y.is_finite() && point.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::GridConfig;

    fn setup() -> (VoxelGrid, CameraIntrinsics) {
        let grid = VoxelGrid::new(&GridConfig {
            image_width: 4,
            image_height: 4,
            pixel_step: 1.0,
            min_depth: 0.0,
            max_depth: 4.0,
            depth_step: 1.0,
        })
        .unwrap();
        // identity-like mapping around a 4x4 plane
        let intrinsics = CameraIntrinsics::new(1.0, 1.0, 2.0, 2.0);
        (grid, intrinsics)
    }

    #[test]
    fn test_counts_accumulate_per_voxel() {
        let (grid, intrinsics) = setup();
        // all points project near the principal point at depth 1.5
        let cloud = vec![Point3::new(0.0, 0.0, 1.5); 10];
        let obs = Observation::extract(&cloud, &grid, &intrinsics);
        let expected_index =
            grid.coordinate_to_index(&intrinsics.metric_to_pixel(&Point3::new(0.0, 0.0, 1.5)));
        assert_eq!(obs.count(expected_index), 10);
        assert_eq!(obs.valid_points(), 10);
        assert_eq!(obs.outliers(), 0);
        assert_eq!(obs.counts().iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_non_finite_points_become_outliers() {
        let (grid, intrinsics) = setup();
        let cloud = vec![
            Point3::new(f64::NAN, 0.0, 1.0),
            Point3::new(0.0, f64::INFINITY, 1.0),
            Point3::new(0.0, 0.0, 1.5),
        ];
        let obs = Observation::extract(&cloud, &grid, &intrinsics);
        assert_eq!(obs.outliers(), 2);
        assert_eq!(obs.valid_points(), 1);
        assert_eq!(obs.counts().iter().sum::<usize>(), 1);
    }

    #[test]
    fn test_points_behind_sensor_absorb() {
        let (grid, intrinsics) = setup();
        let cloud = vec![Point3::new(0.1, 0.1, -1.0), Point3::new(0.0, 0.0, 0.0)];
        let obs = Observation::extract(&cloud, &grid, &intrinsics);
        assert_eq!(obs.count(grid.absorbing_index()), 2);
        assert_eq!(obs.outliers(), 0);
    }

    #[test]
    fn test_pivot_is_nearest_valid_point() {
        let (grid, intrinsics) = setup();
        let near = Point3::new(0.0, 0.0, 0.8);
        let cloud = vec![
            Point3::new(0.5, 0.5, 3.0),
            near,
            Point3::new(f64::NAN, 0.0, 0.1),
            Point3::new(0.0, 0.1, 2.0),
        ];
        let obs = Observation::extract(&cloud, &grid, &intrinsics);
        assert_eq!(obs.pivot(), Some(near));
    }

    #[test]
    fn test_empty_cloud() {
        let (grid, intrinsics) = setup();
        let obs = Observation::extract(&[], &grid, &intrinsics);
        assert_eq!(obs.pivot(), None);
        assert_eq!(obs.valid_points(), 0);
        assert!(obs.counts().iter().all(|&c| c == 0));
    }
}
