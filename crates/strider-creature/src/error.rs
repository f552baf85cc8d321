use strider_physics::PhysicsError;
use thiserror::Error;

use crate::policy::PolicyKind;

/// Failure to instantiate a blueprint into a world
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("blueprint {blueprint}: joint {joint} references unknown body {body}")]
    UnknownBody {
        blueprint: String,
        joint: String,
        body: String,
    },
    #[error("blueprint {blueprint}: root body {root} is not defined")]
    MissingRoot { blueprint: String, root: String },
    #[error("blueprint {0} has no motor joints")]
    NoMotorJoints(String),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{kind} policy expects {expected} parameters, got {actual}")]
    ParamLength {
        kind: PolicyKind,
        expected: usize,
        actual: usize,
    },
}
