//! Robot blueprints: body and joint templates independent of any world
//!
//! Blueprints are plain values. Spawning copies them into a
//! [`strider_physics::PhysicsWorld`]; mutation returns a new blueprint.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use strider_physics::Shape;

/// Body template, positioned relative to the spawn point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    pub name: String,
    pub offset: Vec2,
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub color: [u8; 4],
    pub is_foot: bool,
}

/// Hinge template, referencing bodies by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDef {
    pub name: String,
    pub body_a: String,
    pub body_b: String,
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub lower: f32,
    pub upper: f32,
    pub motor: bool,
    pub max_torque: f32,
    pub damping: f32,
}

/// Angular range of one motor joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f32,
    pub upper: f32,
}

impl JointLimits {
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.lower, self.upper)
    }
}

/// Complete body plan of a robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotBlueprint {
    pub name: String,
    pub bodies: Vec<BodyDef>,
    pub joints: Vec<JointDef>,
    pub root: String,
}

impl RobotBlueprint {
    pub fn motor_joints(&self) -> impl Iterator<Item = &JointDef> {
        self.joints.iter().filter(|j| j.motor)
    }

    pub fn motor_joint_count(&self) -> usize {
        self.motor_joints().count()
    }

    pub fn foot_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_foot).count()
    }

    /// Limits of every motor joint, in blueprint order
    pub fn motor_limits(&self) -> Vec<JointLimits> {
        self.motor_joints()
            .map(|j| JointLimits {
                lower: j.lower.min(j.upper),
                upper: j.lower.max(j.upper),
            })
            .collect()
    }

    pub fn body(&self, name: &str) -> Option<&BodyDef> {
        self.bodies.iter().find(|b| b.name == name)
    }
}

/// Fixed catalog of body plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BlueprintId {
    /// Torso on two legs, hips and knees motorized
    #[default]
    Biped,
    /// Long torso on four two-segment legs
    Quadruped,
    /// Low torso dragged by two short limbs with foot pads
    Crawler,
}

impl BlueprintId {
    pub fn all() -> &'static [BlueprintId] {
        &[
            BlueprintId::Biped,
            BlueprintId::Quadruped,
            BlueprintId::Crawler,
        ]
    }

    pub fn blueprint(&self) -> RobotBlueprint {
        match self {
            BlueprintId::Biped => RobotBlueprint::biped(),
            BlueprintId::Quadruped => RobotBlueprint::quadruped(),
            BlueprintId::Crawler => RobotBlueprint::crawler(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlueprintId::Biped => "biped",
            BlueprintId::Quadruped => "quadruped",
            BlueprintId::Crawler => "crawler",
        }
    }
}

impl std::fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BlueprintId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "biped" => Ok(BlueprintId::Biped),
            "quadruped" | "quad" => Ok(BlueprintId::Quadruped),
            "crawler" => Ok(BlueprintId::Crawler),
            _ => Err(format!(
                "Unknown blueprint: {}. Valid: biped, quadruped, crawler",
                s
            )),
        }
    }
}

// Limb densities are high on purpose: the anchor springs are stiff and the
// optimizer integrates with only two substeps per step.
const LIMB_DENSITY: f32 = 2000.0;
const PAD_DENSITY: f32 = 4000.0;

const TORSO_COLOR: [u8; 4] = [90, 140, 220, 255];
const NEAR_LIMB_COLOR: [u8; 4] = [230, 160, 70, 255];
const FAR_LIMB_COLOR: [u8; 4] = [170, 110, 50, 255];
const FOOT_COLOR: [u8; 4] = [80, 200, 120, 255];

fn rect(name: &str, offset: Vec2, half: Vec2, density: f32, color: [u8; 4]) -> BodyDef {
    BodyDef {
        name: name.to_string(),
        offset,
        shape: Shape::Rect { half_extents: half },
        density,
        friction: 0.8,
        restitution: 0.0,
        color,
        is_foot: false,
    }
}

fn foot(mut def: BodyDef) -> BodyDef {
    def.is_foot = true;
    def.friction = 1.0;
    def
}

#[allow(clippy::too_many_arguments)]
fn hinge(
    name: &str,
    body_a: &str,
    body_b: &str,
    anchor_a: Vec2,
    anchor_b: Vec2,
    limits: (f32, f32),
    max_torque: f32,
    damping: f32,
) -> JointDef {
    JointDef {
        name: name.to_string(),
        body_a: body_a.to_string(),
        body_b: body_b.to_string(),
        anchor_a,
        anchor_b,
        lower: limits.0,
        upper: limits.1,
        motor: true,
        max_torque,
        damping,
    }
}

impl RobotBlueprint {
    /// Biped: torso, two thighs, two shins (the shins are the feet).
    /// Spawned at `(0, 1.5)` its feet start 0.2 above the ground.
    pub fn biped() -> Self {
        let torso_half = Vec2::new(0.15, 0.3);
        let thigh_half = Vec2::new(0.06, 0.25);
        let shin_half = Vec2::new(0.05, 0.25);
        let thigh_y = -torso_half.y - thigh_half.y;
        let shin_y = thigh_y - thigh_half.y - shin_half.y;

        let mut bodies = vec![rect("torso", Vec2::ZERO, torso_half, LIMB_DENSITY, TORSO_COLOR)];
        let mut joints = Vec::new();
        for (side, color) in [("l", NEAR_LIMB_COLOR), ("r", FAR_LIMB_COLOR)] {
            let thigh = format!("thigh_{}", side);
            let shin = format!("shin_{}", side);
            bodies.push(rect(&thigh, Vec2::new(0.0, thigh_y), thigh_half, LIMB_DENSITY, color));
            bodies.push(foot(rect(
                &shin,
                Vec2::new(0.0, shin_y),
                shin_half,
                LIMB_DENSITY,
                color,
            )));
            joints.push(hinge(
                &format!("hip_{}", side),
                "torso",
                &thigh,
                Vec2::new(0.0, -torso_half.y),
                Vec2::new(0.0, thigh_half.y),
                (-1.0, 1.0),
                1000.0,
                40.0,
            ));
            joints.push(hinge(
                &format!("knee_{}", side),
                &thigh,
                &shin,
                Vec2::new(0.0, -thigh_half.y),
                Vec2::new(0.0, shin_half.y),
                (-1.2, 0.2),
                700.0,
                30.0,
            ));
        }

        Self {
            name: "biped".to_string(),
            bodies,
            joints,
            root: "torso".to_string(),
        }
    }

    /// Quadruped: torso with a near and far leg at the front and back.
    /// Spawned at `(0, 1.5)` its feet start 0.1 above the ground.
    pub fn quadruped() -> Self {
        let torso_half = Vec2::new(0.45, 0.12);
        let thigh_half = Vec2::new(0.07, 0.18);
        let shin_half = Vec2::new(0.06, 0.18);
        let torso_y = -0.56;
        let thigh_y = torso_y - torso_half.y - thigh_half.y;
        let shin_y = thigh_y - thigh_half.y - shin_half.y;

        let mut bodies = vec![rect(
            "torso",
            Vec2::new(0.0, torso_y),
            torso_half,
            LIMB_DENSITY,
            TORSO_COLOR,
        )];
        let mut joints = Vec::new();
        for (end, x) in [("front", 0.35), ("back", -0.35)] {
            for (side, color) in [("near", NEAR_LIMB_COLOR), ("far", FAR_LIMB_COLOR)] {
                let thigh = format!("{}_{}_thigh", end, side);
                let shin = format!("{}_{}_shin", end, side);
                bodies.push(rect(&thigh, Vec2::new(x, thigh_y), thigh_half, LIMB_DENSITY, color));
                bodies.push(foot(rect(
                    &shin,
                    Vec2::new(x, shin_y),
                    shin_half,
                    LIMB_DENSITY,
                    color,
                )));
                joints.push(hinge(
                    &format!("{}_{}_hip", end, side),
                    "torso",
                    &thigh,
                    Vec2::new(x, -torso_half.y),
                    Vec2::new(0.0, thigh_half.y),
                    (-0.9, 0.9),
                    500.0,
                    25.0,
                ));
                joints.push(hinge(
                    &format!("{}_{}_knee", end, side),
                    &thigh,
                    &shin,
                    Vec2::new(0.0, -thigh_half.y),
                    Vec2::new(0.0, shin_half.y),
                    (-1.0, 1.0),
                    350.0,
                    15.0,
                ));
            }
        }

        Self {
            name: "quadruped".to_string(),
            bodies,
            joints,
            root: "torso".to_string(),
        }
    }

    /// Crawler: flat torso pulled along by a front and rear limb ending in
    /// foot pads. Spawned at `(0, 1.5)` its pads start 0.06 above the ground.
    pub fn crawler() -> Self {
        let torso_half = Vec2::new(0.35, 0.1);
        let limb_half = Vec2::new(0.07, 0.14);
        let pad_half = Vec2::new(0.08, 0.03);
        let torso_y = -1.0;
        let limb_y = torso_y - torso_half.y - limb_half.y;
        let pad_y = limb_y - limb_half.y - pad_half.y;

        let mut bodies = vec![rect(
            "torso",
            Vec2::new(0.0, torso_y),
            torso_half,
            LIMB_DENSITY,
            TORSO_COLOR,
        )];
        let mut joints = Vec::new();
        for (end, x) in [("front", 0.28), ("rear", -0.28)] {
            let limb = format!("{}_limb", end);
            let pad = format!("{}_pad", end);
            bodies.push(rect(&limb, Vec2::new(x, limb_y), limb_half, LIMB_DENSITY, NEAR_LIMB_COLOR));
            bodies.push(foot(rect(&pad, Vec2::new(x, pad_y), pad_half, PAD_DENSITY, FOOT_COLOR)));
            joints.push(hinge(
                &format!("{}_shoulder", end),
                "torso",
                &limb,
                Vec2::new(x, -torso_half.y),
                Vec2::new(0.0, limb_half.y),
                (-1.2, 1.2),
                250.0,
                10.0,
            ));
            joints.push(hinge(
                &format!("{}_ankle", end),
                &limb,
                &pad,
                Vec2::new(0.0, -limb_half.y),
                Vec2::new(0.0, pad_half.y),
                (-0.6, 0.6),
                60.0,
                2.0,
            ));
        }

        Self {
            name: "crawler".to_string(),
            bodies,
            joints,
            root: "torso".to_string(),
        }
    }
}
