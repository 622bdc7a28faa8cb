//! Configuration for the tracking engine.
//!
//! Decomposed per concern: discretization, action bounds, noise, reward
//! shaping, and the offline solver. The aggregate [`EngineConfig`] carries a
//! builder and a fatal validation pass; an invalid configuration refuses to
//! initialize the engine rather than degrading.

use std::path::PathBuf;

use nalgebra::Vector3;

use crate::geometry::CameraIntrinsics;
use crate::motion::RobotMotion;

use super::errors::TrackerError;

/// Discretization of the sensing volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Image width in pixels
    pub image_width: usize,
    /// Image height in pixels
    pub image_height: usize,
    /// Cell size on the image plane, pixels
    pub pixel_step: f64,
    /// Near edge of the sensed depth range, meters
    pub min_depth: f64,
    /// Far edge of the sensed depth range, meters
    pub max_depth: f64,
    /// Cell size along the depth axis, meters
    pub depth_step: f64,
}

impl GridConfig {
    /// Grid width in cells.
    #[inline]
    pub fn grid_width(&self) -> usize {
        (self.image_width as f64 / self.pixel_step).floor() as usize
    }

    /// Grid height in cells.
    #[inline]
    pub fn grid_height(&self) -> usize {
        (self.image_height as f64 / self.pixel_step).floor() as usize
    }

    /// Grid depth in cells.
    #[inline]
    pub fn grid_depth(&self) -> usize {
        ((self.max_depth - self.min_depth) / self.depth_step).floor() as usize
    }

    /// Total states including the absorbing cell.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.grid_width() * self.grid_height() * self.grid_depth() + 1
    }

    /// Reject discretizations that cannot carry a distribution.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(self.pixel_step > 0.0) || !(self.depth_step > 0.0) {
            return Err(TrackerError::Configuration {
                description: "pixel and depth steps must be positive".to_string(),
            });
        }
        if !(self.max_depth > self.min_depth) || !self.min_depth.is_finite() {
            return Err(TrackerError::Configuration {
                description: "depth range must be finite with max above min".to_string(),
            });
        }
        if self.num_states() <= 1 {
            return Err(TrackerError::Configuration {
                description: format!(
                    "grid {}x{}x{} has no interior cells",
                    self.grid_width(),
                    self.grid_height(),
                    self.grid_depth()
                ),
            });
        }
        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            image_width: super::DEFAULT_IMAGE_WIDTH,
            image_height: super::DEFAULT_IMAGE_HEIGHT,
            pixel_step: super::DEFAULT_PIXEL_STEP,
            min_depth: super::DEFAULT_MIN_DEPTH,
            max_depth: super::DEFAULT_MAX_DEPTH,
            depth_step: super::DEFAULT_DEPTH_STEP,
        }
    }
}

/// Bounds and step sizes of the candidate action lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionBounds {
    /// Minimum (vx, vy, yaw_rate)
    pub min: Vector3<f64>,
    /// Maximum (vx, vy, yaw_rate)
    pub max: Vector3<f64>,
    /// Step per axis
    pub step: Vector3<f64>,
}

impl ActionBounds {
    /// Reject bounds that enumerate no actions.
    pub fn validate(&self) -> Result<(), TrackerError> {
        for axis in 0..3 {
            if !(self.step[axis] > 0.0) {
                return Err(TrackerError::Configuration {
                    description: format!("action step on axis {} must be positive", axis),
                });
            }
            if self.max[axis] < self.min[axis] {
                return Err(TrackerError::Configuration {
                    description: format!("action bounds on axis {} are inverted", axis),
                });
            }
        }
        Ok(())
    }
}

impl Default for ActionBounds {
    fn default() -> Self {
        Self {
            min: Vector3::new(0.0, -0.25, -0.5),
            max: Vector3::new(0.5, 0.25, 0.5),
            step: Vector3::new(0.25, 0.25, 0.5),
        }
    }
}

/// Expected per-voxel point count for the observation likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpectedCount {
    /// Use the cycle's maximum per-voxel count as the target, making the
    /// likelihood self-scaling across point densities
    Adaptive,
    /// A calibrated fixed target density
    Fixed(f64),
}

/// Noise parameters of the transition and observation models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    /// Positional spread of the transition rows, grid units
    pub transition_sdev: f64,
    /// Spread of the count likelihood around the expected count
    pub observation_sdev: f64,
    /// Expected count strategy
    pub expected_count: ExpectedCount,
}

impl NoiseConfig {
    /// Reject non-positive spreads.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(self.transition_sdev > 0.0) || !(self.observation_sdev > 0.0) {
            return Err(TrackerError::Configuration {
                description: "noise standard deviations must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            transition_sdev: super::DEFAULT_TRANSITION_SDEV,
            observation_sdev: super::DEFAULT_OBSERVATION_SDEV,
            expected_count: ExpectedCount::Adaptive,
        }
    }
}

/// Reward shaping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardConfig {
    /// Gain of the repulsive potential
    pub repulsion_gain: f64,
    /// Distance beyond which the repulsive potential vanishes, meters
    pub repulsion_max_distance: f64,
    /// Per-axis weights of the centering term (u, v, depth)
    pub centering_weights: Vector3<f64>,
}

impl RewardConfig {
    /// Reject unusable shaping parameters.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(self.repulsion_max_distance > 0.0) {
            return Err(TrackerError::Configuration {
                description: "repulsion cutoff distance must be positive".to_string(),
            });
        }
        if self.repulsion_gain < 0.0 {
            return Err(TrackerError::Configuration {
                description: "repulsion gain must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            repulsion_gain: super::DEFAULT_REPULSION_GAIN,
            repulsion_max_distance: super::DEFAULT_REPULSION_MAX_DISTANCE,
            centering_weights: Vector3::new(0.005, 0.005, 1.0),
        }
    }
}

/// Offline value-iteration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Number of synchronous Bellman sweeps
    pub iterations: usize,
    /// Discount factor, in [0, 1)
    pub discount: f64,
}

impl SolverConfig {
    /// Reject discounts outside [0, 1).
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(0.0..1.0).contains(&self.discount) {
            return Err(TrackerError::Configuration {
                description: format!("discount factor {} outside [0, 1)", self.discount),
            });
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: super::DEFAULT_SOLVER_ITERATIONS,
            discount: super::DEFAULT_DISCOUNT,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Discretization of the sensing volume
    pub grid: GridConfig,
    /// Candidate action lattice
    pub actions: ActionBounds,
    /// Noise parameters
    pub noise: NoiseConfig,
    /// Reward shaping
    pub reward: RewardConfig,
    /// Offline solver parameters
    pub solver: SolverConfig,
    /// Camera intrinsics at startup
    pub intrinsics: CameraIntrinsics,
    /// Lookahead interval for motion prediction, seconds
    pub lookahead: f64,
    /// Motion assumed when building the transition model offline
    pub nominal_motion: RobotMotion,
    /// Directory holding persisted matrices; `None` always re-solves
    pub artifact_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Create a builder with defaults for everything but the intrinsics.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate every section; any failure is fatal at engine construction.
    pub fn validate(&self) -> Result<(), TrackerError> {
        self.grid.validate()?;
        self.actions.validate()?;
        self.noise.validate()?;
        self.reward.validate()?;
        self.solver.validate()?;
        if !(self.lookahead >= 0.0) || !self.lookahead.is_finite() {
            return Err(TrackerError::Configuration {
                description: "lookahead interval must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    grid: Option<GridConfig>,
    actions: Option<ActionBounds>,
    noise: Option<NoiseConfig>,
    reward: Option<RewardConfig>,
    solver: Option<SolverConfig>,
    intrinsics: Option<CameraIntrinsics>,
    lookahead: Option<f64>,
    nominal_motion: Option<RobotMotion>,
    artifact_dir: Option<PathBuf>,
}

impl EngineConfigBuilder {
    /// Set the grid discretization.
    pub fn grid(mut self, grid: GridConfig) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Set the action bounds.
    pub fn actions(mut self, actions: ActionBounds) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Set the noise parameters.
    pub fn noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Set the reward shaping parameters.
    pub fn reward(mut self, reward: RewardConfig) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Set the solver parameters.
    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Set the camera intrinsics (required).
    pub fn intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    /// Set the lookahead interval.
    pub fn lookahead(mut self, lookahead: f64) -> Self {
        self.lookahead = Some(lookahead);
        self
    }

    /// Set the nominal motion for offline transition construction.
    pub fn nominal_motion(mut self, motion: RobotMotion) -> Self {
        self.nominal_motion = Some(motion);
        self
    }

    /// Set the persisted-artifact directory.
    pub fn artifact_dir(mut self, dir: PathBuf) -> Self {
        self.artifact_dir = Some(dir);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EngineConfig, TrackerError> {
        let config = EngineConfig {
            grid: self.grid.unwrap_or_default(),
            actions: self.actions.unwrap_or_default(),
            noise: self.noise.unwrap_or_default(),
            reward: self.reward.unwrap_or_default(),
            solver: self.solver.unwrap_or_default(),
            intrinsics: self.intrinsics.ok_or_else(|| TrackerError::Configuration {
                description: "camera intrinsics are required".to_string(),
            })?,
            lookahead: self.lookahead.unwrap_or(super::DEFAULT_LOOKAHEAD),
            nominal_motion: self.nominal_motion.unwrap_or_default(),
            artifact_dir: self.artifact_dir,
        };
        config.validate()?;
        Ok(config)
    }
}
