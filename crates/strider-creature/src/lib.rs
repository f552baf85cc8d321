//! Walking robots for Strider
//!
//! This crate implements:
//! - Robot blueprints and the fixed catalog (biped, quadruped, crawler)
//! - Spawning blueprints into a [`strider_physics::PhysicsWorld`]
//! - Morphology mutation (feature `evolution`)
//! - Proprioceptive observations and episode fitness
//! - Oscillator, reflex and hybrid motor policies

pub mod blueprint;
pub mod builder;
pub mod error;
pub mod policy;
pub mod sensors;

// Re-export main types for convenience
pub use blueprint::{BlueprintId, BodyDef, JointDef, JointLimits, RobotBlueprint};
#[cfg(feature = "evolution")]
pub use builder::mutate_morphology;
pub use builder::{
    SpawnedRobot, hybrid_param_count, oscillator_param_count, reflex_param_count, spawn_robot,
};
pub use error::{BuildError, PolicyError};
pub use policy::{PolicyKind, PolicyParams, compute_targets};
pub use sensors::{
    EpisodeResult, FitnessTracker, FitnessWeights, Observation, WeightPreset,
    compute_episode_score, extract_observations,
};
