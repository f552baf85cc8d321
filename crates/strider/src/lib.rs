//! Strider - robots that learn to walk
//!
//! Ties the physics and creature crates together:
//! - [`task`]: the environments episodes run in
//! - [`training`]: CEM search, morphology evolution, curriculum and the
//!   budgeted [`training::Trainer`]
//! - [`playback`]: replaying a champion in its own live world
//! - [`config`]: layered training settings (native only)

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
pub mod playback;
pub mod task;
pub mod training;

// Re-export crates for convenience
pub use strider_creature as creature;
pub use strider_physics as physics;

pub use playback::{LiveSession, apply_champion};
pub use task::{Task, TaskId};
pub use training::{GenerationStatus, Trainer, TrainerConfig};
