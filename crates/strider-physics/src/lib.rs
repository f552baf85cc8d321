//! Fixed-step 2D physics for Strider creatures
//!
//! This crate implements:
//! - Rigid bodies (rectangles and circles) with density-derived mass
//! - Hinge joints held together by stiff anchor springs, with PD motors
//! - Semi-implicit Euler integration in fixed substeps
//! - Cheap ground plane and platform contact for feet and terrain
//!
//! Bodies and joints live in dense arenas inside [`PhysicsWorld`] and are
//! referenced by [`BodyId`] / [`JointId`].

pub mod body;
pub mod error;
pub mod joint;
pub mod math;
pub mod platform;
pub mod world;

pub use body::{BodyDesc, BodyId, RigidBody, STATIC_MASS, Shape};
pub use error::PhysicsError;
pub use joint::{HingeJoint, JointDesc, JointId};
pub use platform::Platform;
pub use world::{
    BodyState, BodyView, CONTACT_SLOP, GROUND_Y, JointView, PhysicsWorld, WorldSnapshot,
};
