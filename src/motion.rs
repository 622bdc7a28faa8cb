//! Relative motion prediction for the tracked point.
//!
//! The robot's own motion makes a static tracked point drift through the
//! sensing volume. The transition and reward builders need the point's
//! predicted camera-frame position after a lookahead interval; the exact
//! integration scheme is a swappable strategy so hosts with richer dynamics
//! can substitute their own.

use nalgebra::{Point3, Rotation3, Vector3};

/// Planar robot motion: linear velocity and yaw rate in the body frame.
///
/// `linear_x` is forward, `linear_y` is left, `yaw_rate` is counterclockwise
/// about the body's up axis, following the usual mobile-base convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotMotion {
    /// Forward velocity (m/s)
    pub linear_x: f64,
    /// Leftward velocity (m/s)
    pub linear_y: f64,
    /// Yaw rate (rad/s), positive counterclockwise
    pub yaw_rate: f64,
}

impl RobotMotion {
    /// Create a motion from its three components.
    pub fn new(linear_x: f64, linear_y: f64, yaw_rate: f64) -> Self {
        Self {
            linear_x,
            linear_y,
            yaw_rate,
        }
    }

    /// A robot at rest.
    pub fn stationary() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Interpret an action vector `(vx, vy, yaw_rate)` as a hypothetical
    /// motion, for evaluating candidate commands.
    pub fn from_action(action: &Vector3<f64>) -> Self {
        Self::new(action.x, action.y, action.z)
    }
}

impl Default for RobotMotion {
    fn default() -> Self {
        Self::stationary()
    }
}

/// Strategy for propagating a tracked point through one lookahead interval.
///
/// Implementations take the point's current metric camera-frame position and
/// the robot motion, and return the predicted position after `dt` seconds.
pub trait MotionPredictor: Send + Sync {
    /// Predict the point's camera-frame position after `dt` seconds of the
    /// given robot motion.
    fn propagate(&self, point: &Point3<f64>, motion: &RobotMotion, dt: f64) -> Point3<f64>;

    /// Get strategy name
    fn name(&self) -> &'static str;
}

/// Constant-velocity Euler integration, the default prediction scheme.
///
/// The tracked point is assumed static in the world, so its apparent velocity
/// is the negated robot velocity mapped into the camera frame, applied in a
/// single Euler step, followed by the inverse of the robot's yaw rotation.
///
/// Axis mapping between the body frame (x forward, y left, z up) and the
/// camera frame (x right, y down, z forward):
/// body +x -> camera +z, body +y -> camera -x, body +z -> camera -y.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantVelocityEuler;

impl MotionPredictor for ConstantVelocityEuler {
    fn propagate(&self, point: &Point3<f64>, motion: &RobotMotion, dt: f64) -> Point3<f64> {
        // Apparent point velocity in the camera frame is the negated robot
        // velocity: forward motion shrinks depth, leftward motion shifts the
        // scene right.
        let apparent = Vector3::new(motion.linear_y, 0.0, -motion.linear_x);
        let translated = point + apparent * dt;

        // The robot yawing counterclockwise about its up axis (camera -y)
        // rotates the scene the opposite way; expressed about camera +y the
        // inverse rotation has the same sign as the yaw.
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), motion.yaw_rate * dt);
        rotation * translated
    }

    fn name(&self) -> &'static str {
        "ConstantVelocityEuler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_robot_leaves_point_fixed() {
        let predictor = ConstantVelocityEuler;
        let p = Point3::new(0.3, -0.1, 2.0);
        let out = predictor.propagate(&p, &RobotMotion::stationary(), 0.5);
        assert!((out - p).norm() < 1e-12);
    }

    #[test]
    fn test_forward_motion_shrinks_depth() {
        let predictor = ConstantVelocityEuler;
        let p = Point3::new(0.0, 0.0, 2.0);
        let out = predictor.propagate(&p, &RobotMotion::new(1.0, 0.0, 0.0), 0.5);
        assert!((out.z - 1.5).abs() < 1e-12);
        assert!(out.x.abs() < 1e-12);
        assert!(out.y.abs() < 1e-12);
    }

    #[test]
    fn test_leftward_motion_shifts_scene_right() {
        let predictor = ConstantVelocityEuler;
        let p = Point3::new(0.0, 0.0, 2.0);
        let out = predictor.propagate(&p, &RobotMotion::new(0.0, 0.5, 0.0), 1.0);
        assert!((out.x - 0.5).abs() < 1e-12);
        assert!((out.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_preserves_range() {
        let predictor = ConstantVelocityEuler;
        let p = Point3::new(0.4, 0.0, 2.0);
        let motion = RobotMotion::new(0.0, 0.0, 0.3);
        let out = predictor.propagate(&p, &motion, 1.0);
        // a pure rotation keeps the distance to the camera unchanged
        assert!((out.coords.norm() - p.coords.norm()).abs() < 1e-10);
        assert!((out.x - p.x).abs() > 1e-6);
    }

    #[test]
    fn test_zero_interval_is_identity() {
        let predictor = ConstantVelocityEuler;
        let p = Point3::new(-0.2, 0.1, 1.2);
        let motion = RobotMotion::new(0.7, -0.3, 1.1);
        let out = predictor.propagate(&p, &motion, 0.0);
        assert!((out - p).norm() < 1e-12);
    }
}
