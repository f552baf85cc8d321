//! Instantiating blueprints into a physics world, morphology mutation and
//! policy sizing.

use std::collections::HashMap;

use glam::Vec2;
use strider_physics::{BodyDesc, BodyId, JointDesc, JointId, PhysicsWorld, Shape};

use crate::blueprint::RobotBlueprint;
use crate::error::BuildError;

/// Smallest half-extent (or radius) a mutated body may shrink to
pub const MIN_HALF_EXTENT: f32 = 0.02;
/// Smallest density a mutated body may reach
pub const MIN_DENSITY: f32 = 50.0;
/// Scale of the additive offset jitter relative to mutation strength
pub const OFFSET_SCALE: f32 = 0.1;
/// Narrowest angular range a mutated joint keeps
pub const MIN_JOINT_SPAN: f32 = 0.1;
const MIN_MAX_TORQUE: f32 = 1.0;

/// Handles of a robot spawned into a world
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedRobot {
    pub root: BodyId,
    /// Every body, in blueprint order
    pub bodies: Vec<BodyId>,
    /// Motor joints, in blueprint order
    pub motor_joints: Vec<JointId>,
    /// Foot bodies, in blueprint order
    pub feet: Vec<BodyId>,
}

impl RobotBlueprint {
    /// Check that the root and every joint endpoint name a body
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.body(&self.root).is_none() {
            return Err(BuildError::MissingRoot {
                blueprint: self.name.clone(),
                root: self.root.clone(),
            });
        }
        for joint in &self.joints {
            for body in [&joint.body_a, &joint.body_b] {
                if self.body(body).is_none() {
                    return Err(BuildError::UnknownBody {
                        blueprint: self.name.clone(),
                        joint: joint.name.clone(),
                        body: body.clone(),
                    });
                }
            }
        }
        if self.motor_joint_count() == 0 {
            return Err(BuildError::NoMotorJoints(self.name.clone()));
        }
        Ok(())
    }

    /// Lowest point of any body relative to the spawn position, ignoring rotation
    pub fn lowest_offset(&self) -> f32 {
        self.bodies
            .iter()
            .map(|b| match b.shape {
                Shape::Rect { half_extents } => b.offset.y - half_extents.y,
                Shape::Circle { radius } => b.offset.y - radius,
            })
            .fold(0.0, f32::min)
    }
}

/// Add every body and joint of `blueprint` to `world`, offset from `(x, y)`.
///
/// The blueprint is validated first so a failed spawn never leaves a
/// half-built robot behind.
pub fn spawn_robot(
    world: &mut PhysicsWorld,
    blueprint: &RobotBlueprint,
    x: f32,
    y: f32,
) -> Result<SpawnedRobot, BuildError> {
    blueprint.validate()?;

    let origin = Vec2::new(x, y);
    let mut by_name: HashMap<&str, BodyId> = HashMap::with_capacity(blueprint.bodies.len());
    let mut bodies = Vec::with_capacity(blueprint.bodies.len());
    let mut feet = Vec::new();

    for def in &blueprint.bodies {
        let id = world.add_body(BodyDesc {
            name: def.name.clone(),
            position: origin + def.offset,
            angle: 0.0,
            shape: def.shape,
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_static: false,
            is_foot: def.is_foot,
            color: def.color,
        });
        by_name.insert(def.name.as_str(), id);
        bodies.push(id);
        if def.is_foot {
            feet.push(id);
        }
    }

    let mut motor_joints = Vec::new();
    for def in &blueprint.joints {
        // Names were checked by validate()
        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| BuildError::UnknownBody {
                    blueprint: blueprint.name.clone(),
                    joint: def.name.clone(),
                    body: name.to_string(),
                })
        };
        let id = world.add_joint(JointDesc {
            name: def.name.clone(),
            body_a: lookup(&def.body_a)?,
            body_b: lookup(&def.body_b)?,
            anchor_a: def.anchor_a,
            anchor_b: def.anchor_b,
            lower: def.lower,
            upper: def.upper,
            motor: def.motor,
            max_torque: def.max_torque,
            damping: def.damping,
        })?;
        if def.motor {
            motor_joints.push(id);
        }
    }

    let root = by_name
        .get(blueprint.root.as_str())
        .copied()
        .ok_or_else(|| BuildError::MissingRoot {
            blueprint: blueprint.name.clone(),
            root: blueprint.root.clone(),
        })?;

    log::debug!(
        "Spawned {} at ({:.2}, {:.2}): {} bodies, {} motors, {} feet",
        blueprint.name,
        x,
        y,
        bodies.len(),
        motor_joints.len(),
        feet.len()
    );

    Ok(SpawnedRobot {
        root,
        bodies,
        motor_joints,
        feet,
    })
}

/// Oscillator layout: `[offset, amplitude, phase]` per motor joint, then frequency
pub(crate) fn oscillator_len(motor_joints: usize) -> usize {
    3 * motor_joints + 1
}

/// Reflex layout: `[w_tilt, w_vx, w_contact, bias]` per motor joint
pub(crate) fn reflex_len(motor_joints: usize) -> usize {
    4 * motor_joints
}

/// Hybrid layout: oscillator block, reflex block, one blend weight per motor joint
pub(crate) fn hybrid_len(motor_joints: usize) -> usize {
    oscillator_len(motor_joints) + reflex_len(motor_joints) + motor_joints
}

pub fn oscillator_param_count(blueprint: &RobotBlueprint) -> usize {
    oscillator_len(blueprint.motor_joint_count())
}

pub fn reflex_param_count(blueprint: &RobotBlueprint) -> usize {
    reflex_len(blueprint.motor_joint_count())
}

pub fn hybrid_param_count(blueprint: &RobotBlueprint) -> usize {
    hybrid_len(blueprint.motor_joint_count())
}

#[cfg(feature = "evolution")]
pub use mutation::mutate_morphology;

#[cfg(feature = "evolution")]
mod mutation {
    use super::*;
    use rand::Rng;
    use std::f32::consts::PI;

    fn jitter(rng: &mut impl Rng, half: f32) -> f32 {
        if half > 0.0 {
            rng.gen_range(-half..half)
        } else {
            0.0
        }
    }

    /// Return a perturbed copy of `blueprint`.
    ///
    /// Sizes, densities and motor torques scale by `1 + U(-s/2, s/2)`; joint
    /// limits and body offsets move additively. Anchors follow their body's
    /// resize and each child is re-seated on its parent so joints start
    /// closed. Joints must list parents before children, as the catalog does.
    pub fn mutate_morphology(
        blueprint: &RobotBlueprint,
        strength: f32,
        rng: &mut impl Rng,
    ) -> RobotBlueprint {
        let half = strength.abs() * 0.5;
        let mut out = blueprint.clone();

        // Per-body resize ratio, applied to anchors afterwards
        let mut ratios: HashMap<String, Vec2> = HashMap::with_capacity(out.bodies.len());
        for body in &mut out.bodies {
            let factor = 1.0 + jitter(rng, half);
            let ratio = match &mut body.shape {
                Shape::Rect { half_extents } => {
                    let old = *half_extents;
                    *half_extents = (old * factor).max(Vec2::splat(MIN_HALF_EXTENT));
                    *half_extents / old.max(Vec2::splat(f32::EPSILON))
                }
                Shape::Circle { radius } => {
                    let old = *radius;
                    *radius = (old * factor).max(MIN_HALF_EXTENT);
                    Vec2::splat(*radius / old.max(f32::EPSILON))
                }
            };
            body.density = (body.density * (1.0 + jitter(rng, half))).max(MIN_DENSITY);
            ratios.insert(body.name.clone(), ratio);
        }

        let body_index: HashMap<String, usize> = out
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();

        if let Some(&root) = body_index.get(&out.root) {
            let shift = Vec2::new(jitter(rng, half), jitter(rng, half)) * OFFSET_SCALE;
            out.bodies[root].offset += shift;
        }

        for joint in &mut out.joints {
            if let Some(r) = ratios.get(&joint.body_a) {
                joint.anchor_a *= *r;
            }
            if let Some(r) = ratios.get(&joint.body_b) {
                joint.anchor_b *= *r;
            }

            let mut lower = (joint.lower + jitter(rng, half)).clamp(-PI, PI);
            let mut upper = (joint.upper + jitter(rng, half)).clamp(-PI, PI);
            if lower > upper {
                std::mem::swap(&mut lower, &mut upper);
            }
            if upper - lower < MIN_JOINT_SPAN {
                let mid = (0.5 * (lower + upper)).clamp(-PI + MIN_JOINT_SPAN, PI - MIN_JOINT_SPAN);
                lower = mid - 0.5 * MIN_JOINT_SPAN;
                upper = mid + 0.5 * MIN_JOINT_SPAN;
            }
            joint.lower = lower;
            joint.upper = upper;

            if joint.motor {
                joint.max_torque =
                    (joint.max_torque * (1.0 + jitter(rng, half))).max(MIN_MAX_TORQUE);
            }

            // Re-seat the child; the parent's anchor absorbs the offset jitter
            let (Some(&ia), Some(&ib)) = (body_index.get(&joint.body_a), body_index.get(&joint.body_b))
            else {
                continue;
            };
            let shift = Vec2::new(jitter(rng, half), jitter(rng, half)) * OFFSET_SCALE;
            let parent = out.bodies[ia].offset;
            out.bodies[ib].offset = parent + joint.anchor_a - joint.anchor_b + shift;
            joint.anchor_a += shift;
        }

        log::debug!(
            "Mutated {} with strength {:.3}",
            blueprint.name,
            strength
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintId;

    #[test]
    fn test_spawn_biped() {
        let mut world = PhysicsWorld::new();
        let bp = BlueprintId::Biped.blueprint();
        let robot = spawn_robot(&mut world, &bp, 2.0, 1.5).unwrap();

        assert_eq!(robot.bodies.len(), 5);
        assert_eq!(robot.motor_joints.len(), 4);
        assert_eq!(robot.feet.len(), 2);
        let root = world.body(robot.root).unwrap();
        assert_eq!(root.name, "torso");
        assert_eq!(root.position, Vec2::new(2.0, 1.5));
        for id in &robot.motor_joints {
            let joint = world.joint(*id).unwrap();
            assert_eq!(joint.target_angle, 0.0);
            assert_eq!(joint.motor_torque, 0.0);
        }
    }

    #[test]
    fn test_spawn_rejects_dangling_joint() {
        let mut world = PhysicsWorld::new();
        let mut bp = BlueprintId::Crawler.blueprint();
        bp.joints[0].body_b = "tail".to_string();
        let err = spawn_robot(&mut world, &bp, 0.0, 1.5).unwrap_err();
        assert!(matches!(err, BuildError::UnknownBody { ref body, .. } if body == "tail"));
        assert!(world.bodies().is_empty(), "failed spawn must not add bodies");
    }

    #[test]
    fn test_spawn_rejects_missing_root() {
        let mut world = PhysicsWorld::new();
        let mut bp = BlueprintId::Biped.blueprint();
        bp.root = "head".to_string();
        assert!(matches!(
            spawn_robot(&mut world, &bp, 0.0, 1.5),
            Err(BuildError::MissingRoot { .. })
        ));
    }

    #[test]
    fn test_param_counts() {
        let bp = BlueprintId::Biped.blueprint();
        assert_eq!(oscillator_param_count(&bp), 13);
        assert_eq!(reflex_param_count(&bp), 16);
        assert_eq!(hybrid_param_count(&bp), 33);
    }

    #[test]
    fn test_lowest_offset() {
        let bp = BlueprintId::Biped.blueprint();
        assert!((bp.lowest_offset() + 1.3).abs() < 1e-5);
    }

    #[cfg(feature = "evolution")]
    mod mutation_tests {
        use super::*;
        use rand::SeedableRng;
        use rand_xoshiro::Xoshiro256PlusPlus;

        #[test]
        fn test_zero_strength_keeps_blueprint() {
            let bp = BlueprintId::Quadruped.blueprint();
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
            assert_eq!(mutate_morphology(&bp, 0.0, &mut rng), bp);
        }

        #[test]
        fn test_mutation_is_reproducible() {
            let bp = BlueprintId::Biped.blueprint();
            let a = mutate_morphology(&bp, 0.3, &mut Xoshiro256PlusPlus::seed_from_u64(9));
            let b = mutate_morphology(&bp, 0.3, &mut Xoshiro256PlusPlus::seed_from_u64(9));
            assert_eq!(a, b);
            assert_ne!(a, bp);
        }

        #[test]
        fn test_mutation_respects_bounds() {
            let mut bp = BlueprintId::Crawler.blueprint();
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
            for _ in 0..50 {
                bp = mutate_morphology(&bp, 0.8, &mut rng);
            }
            for body in &bp.bodies {
                if let Shape::Rect { half_extents } = body.shape {
                    assert!(half_extents.min_element() >= MIN_HALF_EXTENT);
                }
                assert!(body.density >= MIN_DENSITY);
            }
            for joint in &bp.joints {
                assert!(joint.lower >= -std::f32::consts::PI);
                assert!(joint.upper <= std::f32::consts::PI);
                assert!(joint.upper - joint.lower >= MIN_JOINT_SPAN - 1e-5);
            }
            assert_eq!(bp.motor_joint_count(), 4);
            bp.validate().unwrap();
        }

        #[test]
        fn test_mutated_anchors_still_meet() {
            let bp = BlueprintId::Quadruped.blueprint();
            let mutated = mutate_morphology(&bp, 0.5, &mut Xoshiro256PlusPlus::seed_from_u64(3));
            for joint in &mutated.joints {
                let a = mutated.body(&joint.body_a).unwrap();
                let b = mutated.body(&joint.body_b).unwrap();
                let gap = (a.offset + joint.anchor_a) - (b.offset + joint.anchor_b);
                assert!(gap.length() < 1e-4, "{} opened by {}", joint.name, gap.length());
            }
        }
    }
}
