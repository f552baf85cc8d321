//! Spring-constrained hinge joints with optional PD motors

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::body::BodyId;

/// Dense handle of a joint inside one [`crate::PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JointId(pub usize);

/// Hinge creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointDesc {
    pub name: String,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub lower: f32,
    pub upper: f32,
    pub motor: bool,
    pub max_torque: f32,
    pub damping: f32,
}

/// Hinge joint connecting two bodies at local anchor points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HingeJoint {
    pub name: String,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub lower: f32,
    pub upper: f32,
    pub motor: bool,
    pub max_torque: f32,
    pub damping: f32,
    /// Commanded relative angle, clamped to `[lower, upper]` when applied
    pub target_angle: f32,
    /// Relative angle `angle_b - angle_a`, wrapped to `(-PI, PI]`
    pub current_angle: f32,
    /// Relative angular velocity `omega_b - omega_a`
    pub current_omega: f32,
    /// Torque the motor applied in the last substep
    pub motor_torque: f32,
}

impl HingeJoint {
    pub fn new(desc: JointDesc) -> Self {
        let (lower, upper) = if desc.lower <= desc.upper {
            (desc.lower, desc.upper)
        } else {
            (desc.upper, desc.lower)
        };
        Self {
            name: desc.name,
            body_a: desc.body_a,
            body_b: desc.body_b,
            anchor_a: desc.anchor_a,
            anchor_b: desc.anchor_b,
            lower,
            upper,
            motor: desc.motor,
            max_torque: desc.max_torque,
            damping: desc.damping,
            target_angle: 0.0,
            current_angle: 0.0,
            current_omega: 0.0,
            motor_torque: 0.0,
        }
    }

    /// Proportional gain of the motor
    pub fn kp(&self) -> f32 {
        10.0 * self.max_torque
    }

    pub fn clamp_to_limits(&self, angle: f32) -> f32 {
        angle.clamp(self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_ordered() {
        let joint = HingeJoint::new(JointDesc {
            name: "knee".into(),
            body_a: BodyId(0),
            body_b: BodyId(1),
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            lower: 1.0,
            upper: -1.0,
            motor: true,
            max_torque: 50.0,
            damping: 5.0,
        });
        assert_eq!((joint.lower, joint.upper), (-1.0, 1.0));
        assert_eq!(joint.clamp_to_limits(2.0), 1.0);
        assert_eq!(joint.kp(), 500.0);
    }
}
