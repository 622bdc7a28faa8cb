/*!
# Voxel point filter

Real-time belief tracking of a single sensed point over a discretized
sensing volume, with QMDP action selection balancing tracking against
collision avoidance.

## Features

- Voxelization of an image-plane-by-depth sensing volume with an absorbing
  out-of-range state
- Motion-induced transition model with Gaussian positional uncertainty
- Bayesian belief update fused with per-voxel point counts
- Reward model combining a repulsive potential and view-centering shaping
- Offline QMDP value iteration producing an alpha matrix scored online
  against the belief
- Delimited-text persistence of the offline matrices with strict shape
  validation

## Modules

- [`engine`] - The owning context and per-cycle pipeline
- [`grid`] - Voxel lattice and distance metric
- [`belief`] - Belief distribution, predict and correct steps
- [`models`] - Transition and reward construction
- [`solver`] - Offline value iteration
- [`observation`] - Point-cloud feature extraction
- [`geometry`] - Pinhole projection
- [`actions`] - Action discretization
- [`motion`] - Relative motion prediction strategies
- [`persistence`] - Matrix store
- [`sampling`] - Weighted random draws

## Example

```rust,no_run
use nalgebra::Point3;
use voxel_point_filter_rs::{CameraIntrinsics, EngineConfig, TrackerEngine};

let config = EngineConfig::builder()
    .intrinsics(CameraIntrinsics::new(386.0, 386.0, 320.0, 240.0))
    .build()
    .unwrap();
let mut engine = TrackerEngine::new(config).unwrap();

// one cycle per incoming point cloud
let cloud = vec![Point3::new(0.1, 0.0, 1.8)];
let output = engine.process_cloud(&cloud);
println!("commanded action: {:?}", output.action);
```
*/

pub mod actions;
pub mod belief;
pub mod engine;
pub mod geometry;
pub mod grid;
pub mod models;
pub mod motion;
pub mod observation;
pub mod persistence;
pub mod sampling;
pub mod solver;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Core types
pub use actions::ActionSet;
pub use belief::{count_likelihood, Belief};
pub use geometry::CameraIntrinsics;
pub use grid::VoxelGrid;
pub use motion::{ConstantVelocityEuler, MotionPredictor, RobotMotion};
pub use observation::Observation;

// Engine
pub use engine::config::{
    ActionBounds, EngineConfig, EngineConfigBuilder, ExpectedCount, GridConfig, NoiseConfig,
    RewardConfig, SolverConfig,
};
pub use engine::{CycleOutput, DiagnosticsSnapshot, FrameLookup, TrackerEngine};

// Errors
pub use engine::errors::{PersistenceError, TrackerError};

// Offline construction
pub use models::{build_reward_model, build_transition_model, normal_pdf, repulsive_potential};
pub use persistence::{load_artifacts, save_artifacts, PolicyArtifacts};
pub use solver::solve;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
