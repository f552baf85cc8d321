use thiserror::Error;

use crate::body::BodyId;

#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    #[error("joint '{joint}' references unknown body {body:?}")]
    UnknownBody { joint: String, body: BodyId },

    #[error("joint '{0}' connects a body to itself")]
    SelfJoint(String),

    #[error("snapshot holds {snapshot} bodies but the world has {world}")]
    SnapshotMismatch { snapshot: usize, world: usize },
}
