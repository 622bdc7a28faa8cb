//! Discretization of the sensing volume into a voxel lattice.
//!
//! The volume spanned by the image plane and the configured depth range is
//! partitioned into `W x H x D` cells plus one absorbing out-of-range cell.
//! Interior indices map bijectively to `(ix, iy, iz)` triples through
//! `ix + W * (iy + H * iz)`; the absorbing index `N - 1` has no coordinate
//! and only ever appears as a distribution endpoint.

use nalgebra::Point3;

use crate::engine::config::GridConfig;
use crate::engine::errors::TrackerError;

/// Immutable voxel lattice over pixel (u, v) and depth space.
///
/// Coordinates handled by the grid are pixel-space points: `x` and `y` are
/// pixel coordinates, `z` is metric depth. Conversion to the metric camera
/// frame is the job of [`crate::geometry::CameraIntrinsics`].
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    width: usize,
    height: usize,
    depth: usize,
    pixel_step: f64,
    depth_step: f64,
    min_depth: f64,
    max_depth: f64,
    centers: Vec<Point3<f64>>,
}

impl VoxelGrid {
    /// Build the lattice from a validated grid configuration.
    ///
    /// Fails with a configuration error when the discretization produces
    /// fewer than one interior cell per axis.
    pub fn new(config: &GridConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let width = config.grid_width();
        let height = config.grid_height();
        let depth = config.grid_depth();

        let mut centers = Vec::with_capacity(width * height * depth);
        for iz in 0..depth {
            for iy in 0..height {
                for ix in 0..width {
                    centers.push(Point3::new(
                        (ix as f64 + 0.5) * config.pixel_step,
                        (iy as f64 + 0.5) * config.pixel_step,
                        config.min_depth + (iz as f64 + 0.5) * config.depth_step,
                    ));
                }
            }
        }

        Ok(Self {
            width,
            height,
            depth,
            pixel_step: config.pixel_step,
            depth_step: config.depth_step,
            min_depth: config.min_depth,
            max_depth: config.max_depth,
            centers,
        })
    }

    /// Total number of states, including the absorbing cell.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.centers.len() + 1
    }

    /// Index of the absorbing out-of-range state.
    #[inline]
    pub fn absorbing_index(&self) -> usize {
        self.centers.len()
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Grid depth in cells.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pixel step between cells in u and v.
    #[inline]
    pub fn pixel_step(&self) -> f64 {
        self.pixel_step
    }

    /// Depth step between cells in z.
    #[inline]
    pub fn depth_step(&self) -> f64 {
        self.depth_step
    }

    /// Near edge of the sensed depth range.
    #[inline]
    pub fn min_depth(&self) -> f64 {
        self.min_depth
    }

    /// Far edge of the sensed depth range.
    #[inline]
    pub fn max_depth(&self) -> f64 {
        self.max_depth
    }

    /// Map a pixel-space point to its voxel index.
    ///
    /// Points outside the image plane or the open depth interval
    /// `(min_depth, max_depth)` land in the absorbing state.
    pub fn coordinate_to_index(&self, point: &Point3<f64>) -> usize {
        if point.z <= self.min_depth || point.z >= self.max_depth {
            return self.absorbing_index();
        }

        let ix = (point.x / self.pixel_step).floor();
        let iy = (point.y / self.pixel_step).floor();
        let iz = ((point.z - self.min_depth) / self.depth_step).floor();

        if ix < 0.0 || iy < 0.0 || iz < 0.0 {
            return self.absorbing_index();
        }

        let (ix, iy, iz) = (ix as usize, iy as usize, iz as usize);
        if ix >= self.width || iy >= self.height || iz >= self.depth {
            return self.absorbing_index();
        }

        ix + self.width * (iy + self.height * iz)
    }

    /// Center of an interior voxel in pixel space.
    ///
    /// Returns `None` for the absorbing index, which has no coordinate.
    #[inline]
    pub fn index_to_coordinate(&self, index: usize) -> Option<Point3<f64>> {
        self.centers.get(index).copied()
    }

    /// Manhattan distance between two states in grid units.
    ///
    /// Axis distances are scaled by the pixel step (u, v) and the depth step
    /// (z). When either state is absorbing, the result is the other state's
    /// distance to the nearest grid boundary, standing in for "distance to
    /// anywhere outside the volume". Two absorbing states are at distance 0.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        if i == self.absorbing_index() {
            return self.boundary_distance(j);
        }
        if j == self.absorbing_index() {
            return self.boundary_distance(i);
        }

        let a = self.centers[i];
        let b = self.centers[j];
        ((b.x - a.x) / self.pixel_step).abs()
            + ((b.y - a.y) / self.pixel_step).abs()
            + ((b.z - a.z) / self.depth_step).abs()
    }

    /// Number of cells an interior voxel must cross to exit the volume,
    /// minimized over the five boundaries (right, left, far, upper, lower).
    pub fn boundary_distance(&self, index: usize) -> f64 {
        let (ix, iy, iz) = self.unflatten(index);
        let candidates = [
            self.width - ix,  // right
            ix + 1,           // left
            self.depth - iz,  // far
            iy + 1,           // upper
            self.height - iy, // lower
        ];
        candidates.iter().copied().min().unwrap_or(0) as f64
    }

    #[inline]
    fn unflatten(&self, index: usize) -> (usize, usize, usize) {
        let iz = index / (self.width * self.height);
        let rem = index % (self.width * self.height);
        (rem % self.width, rem / self.width, iz)
    }
}
