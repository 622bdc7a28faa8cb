//! The tracking engine: owned state, per-cycle pipeline, action selection.
//!
//! [`TrackerEngine`] owns every matrix and vector of the decision core and
//! is the single entry point hosts drive. Shared inputs (robot velocity,
//! intrinsics, orientation) are mutated only through the setter operations;
//! hosts with concurrent callbacks must serialize them against
//! [`TrackerEngine::process_cloud`] so one cycle fully completes before the
//! next begins and no partially applied update is ever observed.

pub mod config;
pub mod errors;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector, Point3, UnitQuaternion, Vector3};
use rand::Rng;
use serde::Serialize;

use crate::actions::ActionSet;
use crate::belief::{count_likelihood, Belief};
use crate::geometry::CameraIntrinsics;
use crate::grid::VoxelGrid;
use crate::models::{build_reward_model, build_transition_model};
use crate::motion::{ConstantVelocityEuler, MotionPredictor, RobotMotion};
use crate::observation::Observation;
use crate::persistence::{self, PolicyArtifacts};
use crate::sampling::sample_index;
use crate::solver::solve;

use config::EngineConfig;
use errors::TrackerError;

// ============================================================================
// Defaults
// ============================================================================

/// Default image width, pixels.
pub const DEFAULT_IMAGE_WIDTH: usize = 640;
/// Default image height, pixels.
pub const DEFAULT_IMAGE_HEIGHT: usize = 480;
/// Default cell size on the image plane, pixels.
pub const DEFAULT_PIXEL_STEP: f64 = 80.0;
/// Default near depth edge, meters.
pub const DEFAULT_MIN_DEPTH: f64 = 0.25;
/// Default far depth edge, meters.
pub const DEFAULT_MAX_DEPTH: f64 = 4.75;
/// Default depth cell size, meters.
pub const DEFAULT_DEPTH_STEP: f64 = 0.5;
/// Default transition spread, grid units.
pub const DEFAULT_TRANSITION_SDEV: f64 = 1.0;
/// Default observation-count spread.
pub const DEFAULT_OBSERVATION_SDEV: f64 = 10.0;
/// Default repulsion gain.
pub const DEFAULT_REPULSION_GAIN: f64 = 1.0;
/// Default repulsion cutoff distance, meters.
pub const DEFAULT_REPULSION_MAX_DISTANCE: f64 = 1.5;
/// Default number of value-iteration sweeps.
pub const DEFAULT_SOLVER_ITERATIONS: usize = 50;
/// Default discount factor.
pub const DEFAULT_DISCOUNT: f64 = 0.95;
/// Default lookahead interval, seconds.
pub const DEFAULT_LOOKAHEAD: f64 = 0.5;

// ============================================================================
// Collaborator-facing types
// ============================================================================

/// Outcome of a coordinate-frame lookup performed by the host.
///
/// Hosts resolve the robot velocity into the tracked body's frame before
/// handing it over; when the lookup fails they pass the failure on instead
/// of crashing the cycle, and the engine holds the last known value.
#[derive(Debug, Clone)]
pub enum FrameLookup {
    /// The transform resolved and the motion is expressed in the body frame
    Resolved(RobotMotion),
    /// The transform could not be resolved
    Unavailable(String),
}

/// Result of one sensing cycle.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    /// Index of the chosen action
    pub action_index: usize,
    /// The chosen action vector (vx, vy, yaw_rate)
    pub action: Vector3<f64>,
    /// The cycle's pivot point, metric camera frame
    pub pivot: Option<Point3<f64>>,
    /// Most probable state after the update
    pub dominant_voxel: usize,
    /// Metric position of the dominant voxel, `None` when absorbing
    pub dominant_position: Option<Point3<f64>>,
    /// Per-voxel point counts that drove the correction
    pub counts: Vec<usize>,
    /// Non-finite points excluded from extraction
    pub outliers: usize,
}

/// Read-only diagnostic snapshot for visualization and logging hosts.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Belief over all states
    pub belief: Vec<f64>,
    /// Per-voxel point counts of the last cycle
    pub counts: Vec<usize>,
    /// Pivot point, if any point was valid
    pub pivot: Option<[f64; 3]>,
    /// Most probable state
    pub dominant_voxel: usize,
    /// Metric position of the dominant voxel, `None` when absorbing
    pub dominant_position: Option<[f64; 3]>,
    /// Chosen action index
    pub action_index: usize,
    /// Chosen action vector
    pub action: [f64; 3],
    /// Outlier count of the last cycle
    pub outliers: usize,
}

impl DiagnosticsSnapshot {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The decision/estimation core, owning all matrices and the belief.
///
/// Construction is fatal on invalid configuration. When an artifact
/// directory is configured the persisted matrices are loaded if their shapes
/// match the current discretization; any load failure falls back to solving
/// from scratch, so the engine is always fully ready before the first cycle.
pub struct TrackerEngine {
    config: EngineConfig,
    grid: VoxelGrid,
    actions: ActionSet,
    intrinsics: CameraIntrinsics,
    predictor: Box<dyn MotionPredictor>,
    transition: DMatrix<f64>,
    reward: DMatrix<f64>,
    alpha: DMatrix<f64>,
    belief: Belief,
    motion: RobotMotion,
    orientation: Option<UnitQuaternion<f64>>,
}

impl TrackerEngine {
    /// Build the engine with the default constant-velocity motion predictor.
    pub fn new(config: EngineConfig) -> Result<Self, TrackerError> {
        Self::with_predictor(config, Box::new(ConstantVelocityEuler))
    }

    /// Build the engine with a custom motion-prediction strategy.
    pub fn with_predictor(
        config: EngineConfig,
        predictor: Box<dyn MotionPredictor>,
    ) -> Result<Self, TrackerError> {
        config.validate()?;

        let grid = VoxelGrid::new(&config.grid)?;
        let actions = ActionSet::enumerate(&config.actions);
        if actions.is_empty() {
            return Err(TrackerError::Configuration {
                description: "action bounds enumerate no actions".to_string(),
            });
        }

        let intrinsics = config.intrinsics;
        let n = grid.num_states();
        let m = actions.len();

        let loaded = config.artifact_dir.as_deref().and_then(|dir| {
            match persistence::load_artifacts(dir, n, m) {
                Ok(artifacts) => {
                    info!("loaded persisted policy from {}", dir.display());
                    Some(artifacts)
                }
                Err(e) => {
                    warn!(
                        "persisted policy at {} unusable ({}), re-solving",
                        dir.display(),
                        e
                    );
                    None
                }
            }
        });

        let (transition, reward, alpha) = match loaded {
            Some(artifacts) => (artifacts.transition, artifacts.reward, artifacts.alpha),
            None => {
                let transition = build_transition_model(
                    &grid,
                    &intrinsics,
                    predictor.as_ref(),
                    &config.nominal_motion,
                    config.lookahead,
                    config.noise.transition_sdev,
                );
                let reward = build_reward_model(
                    &grid,
                    &intrinsics,
                    predictor.as_ref(),
                    &actions,
                    &config.reward,
                    config.lookahead,
                );
                let alpha = solve(
                    &transition,
                    &reward,
                    config.solver.iterations,
                    config.solver.discount,
                )?;
                info!("policy solved for {} states, {} actions", n, m);
                (transition, reward, alpha)
            }
        };

        Ok(Self {
            belief: Belief::uniform(n),
            motion: config.nominal_motion,
            orientation: None,
            config,
            grid,
            actions,
            intrinsics,
            predictor,
            transition,
            reward,
            alpha,
        })
    }

    /// Run one sensing cycle: extract features, predict, correct, select.
    pub fn process_cloud(&mut self, cloud: &[Point3<f64>]) -> CycleOutput {
        let observation = Observation::extract(cloud, &self.grid, &self.intrinsics);

        self.belief.predict(&self.transition);
        let weights = count_likelihood(observation.counts(), &self.config.noise);
        self.belief.correct(&weights);

        let (action_index, action) = self.select_action();
        let dominant_voxel = self.belief.dominant();
        let dominant_position = self
            .grid
            .index_to_coordinate(dominant_voxel)
            .map(|c| self.intrinsics.pixel_to_metric(c.x, c.y, c.z));

        debug!(
            "cycle: {} valid points, {} outliers, dominant state {}, action {}",
            observation.valid_points(),
            observation.outliers(),
            dominant_voxel,
            action_index
        );

        CycleOutput {
            action_index,
            action,
            pivot: observation.pivot(),
            dominant_voxel,
            dominant_position,
            counts: observation.counts().to_vec(),
            outliers: observation.outliers(),
        }
    }

    /// Score every action against the current belief and pick the best.
    ///
    /// `score(a) = belief . alpha[:, a]`; ties break toward the lowest
    /// action index, so the choice is deterministic for a given belief.
    pub fn select_action(&self) -> (usize, Vector3<f64>) {
        let scores = self.action_scores();
        let mut best = 0;
        let mut best_score = scores[0];
        for (a, &score) in scores.iter().enumerate().skip(1) {
            if score > best_score {
                best = a;
                best_score = score;
            }
        }
        (best, *self.actions.get(best).unwrap_or(&Vector3::zeros()))
    }

    /// Draw an action index from the softly normalized scores, for
    /// exploration or visualization diversity. The deterministic
    /// [`TrackerEngine::select_action`] remains the policy path.
    pub fn sample_action<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let scores = self.action_scores();
        let min = scores.min();
        // shift scores into non-negative weights
        let weights: Vec<f64> = scores.iter().map(|s| s - min).collect();
        sample_index(&weights, rng)
    }

    /// Expected value of each action under the current belief.
    pub fn action_scores(&self) -> DVector<f64> {
        self.alpha.tr_mul(self.belief.probabilities())
    }

    /// Update the robot velocity from a host-side frame lookup.
    ///
    /// An unavailable transform keeps the last known motion, the documented
    /// degraded mode.
    pub fn update_velocity(&mut self, lookup: FrameLookup) {
        match lookup {
            FrameLookup::Resolved(motion) => self.motion = motion,
            FrameLookup::Unavailable(reason) => {
                warn!(
                    "velocity transform unavailable ({}), holding last value",
                    reason
                );
            }
        }
    }

    /// Replace the camera intrinsics.
    ///
    /// Takes effect immediately for feature extraction; the offline matrices
    /// keep the intrinsics they were built with until
    /// [`TrackerEngine::refresh_transition`] or a rebuild.
    pub fn set_intrinsics(&mut self, intrinsics: CameraIntrinsics) {
        self.intrinsics = intrinsics;
    }

    /// Store the body orientation for motion predictors that use it.
    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = Some(orientation);
    }

    /// Rebuild the transition model from the currently observed motion.
    ///
    /// An offline-priced operation; hosts call it at their own cadence when
    /// the velocity estimate has drifted far from the nominal motion.
    pub fn refresh_transition(&mut self) {
        self.transition = build_transition_model(
            &self.grid,
            &self.intrinsics,
            self.predictor.as_ref(),
            &self.motion,
            self.config.lookahead,
            self.config.noise.transition_sdev,
        );
    }

    /// Persist the three matrices into the configured artifact directory.
    pub fn save_policy(&self) -> Result<(), TrackerError> {
        let dir = self
            .config
            .artifact_dir
            .as_deref()
            .ok_or_else(|| TrackerError::Configuration {
                description: "no artifact directory configured".to_string(),
            })?;
        let artifacts = PolicyArtifacts {
            transition: self.transition.clone(),
            reward: self.reward.clone(),
            alpha: self.alpha.clone(),
        };
        persistence::save_artifacts(dir, &artifacts)?;
        Ok(())
    }

    /// Diagnostic snapshot of the engine state after a cycle.
    pub fn snapshot(&self, output: &CycleOutput) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            belief: self.belief.as_slice().to_vec(),
            counts: output.counts.clone(),
            pivot: output.pivot.map(|p| [p.x, p.y, p.z]),
            dominant_voxel: output.dominant_voxel,
            dominant_position: output.dominant_position.map(|p| [p.x, p.y, p.z]),
            action_index: output.action_index,
            action: [output.action.x, output.action.y, output.action.z],
            outliers: output.outliers,
        }
    }

    /// The voxel grid.
    #[inline]
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// The action set.
    #[inline]
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// The current belief.
    #[inline]
    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// The transition model.
    #[inline]
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    /// The reward model.
    #[inline]
    pub fn reward(&self) -> &DMatrix<f64> {
        &self.reward
    }

    /// The alpha matrix.
    #[inline]
    pub fn alpha(&self) -> &DMatrix<f64> {
        &self.alpha
    }

    /// The last applied robot motion.
    #[inline]
    pub fn motion(&self) -> &RobotMotion {
        &self.motion
    }

    /// The stored body orientation, if any arrived.
    #[inline]
    pub fn orientation(&self) -> Option<&UnitQuaternion<f64>> {
        self.orientation.as_ref()
    }

    /// Number of states.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.grid.num_states()
    }

    /// Number of actions.
    #[inline]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }
}
