//! Pinhole camera intrinsics and pixel/metric projection.
//!
//! Every other part of the crate places voxels and sensed points in a common
//! frame through these two mappings. Pixel-space points carry the depth in
//! their third component, so both directions are `(f64, f64, f64)` triples.

use nalgebra::Point3;
use serde::Serialize;

/// Pinhole camera intrinsics.
///
/// The four classic parameters: focal lengths `fx`, `fy` and principal point
/// `cx`, `cy`, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraIntrinsics {
    /// Horizontal focal length (pixels)
    pub fx: f64,
    /// Vertical focal length (pixels)
    pub fy: f64,
    /// Principal point x (pixels)
    pub cx: f64,
    /// Principal point y (pixels)
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create intrinsics from the four pinhole parameters.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Extract intrinsics from a row-major 3x3 camera matrix
    /// `[fx 0 cx; 0 fy cy; 0 0 1]`, as delivered by calibration messages.
    pub fn from_projection_matrix(k: &[f64; 9]) -> Self {
        Self {
            fx: k[0],
            cx: k[2],
            fy: k[4],
            cy: k[5],
        }
    }

    /// Back-project a pixel coordinate with depth into the metric camera frame.
    ///
    /// `x = (u - cx) * depth / fx`, `y = (v - cy) * depth / fy`, `z = depth`.
    #[inline]
    pub fn pixel_to_metric(&self, u: f64, v: f64, depth: f64) -> Point3<f64> {
        Point3::new(
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        )
    }

    /// Project a metric camera-frame point onto the pixel plane, keeping the
    /// depth as the third component.
    ///
    /// Undefined for `z == 0`; callers must guard before taking this path.
    #[inline]
    pub fn metric_to_pixel(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::new(
            (point.x / point.z) * self.fx + self.cx,
            (point.y / point.z) * self.fy + self.cy,
            point.z,
        )
    }
}
