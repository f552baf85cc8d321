//! Physics world: fixed substep integration, hinge springs, PD motors and
//! cheap ground/platform contact.
//!
//! Each substep runs, in order:
//! 1. reset force accumulators to gravity + wind
//! 2. joint anchor springs and motor torques
//! 3. semi-implicit velocity integration with drag
//! 4. position integration
//! 5. ground contact (plane `y = GROUND_Y`)
//! 6. platform contact
//! 7. foot contact flags
//!
//! Each contact point is pushed out of the surface, then the points sharing a
//! surface normal take a single normal + friction impulse at their centroid.
//! That is not globally consistent for stacked multi-contact, which is fine
//! for feet on terrain.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::body::{BodyDesc, BodyId, RigidBody, Shape};
use crate::error::PhysicsError;
use crate::joint::{HingeJoint, JointDesc, JointId};
use crate::math::{angle_diff, cross, normalize_angle};
use crate::platform::Platform;

/// Substeps per interactive `step`
pub const N_SUBS: usize = 8;
/// Substeps per optimizer `fast_step`
pub const FAST_SUBS: usize = 2;
/// Joint anchor spring stiffness
pub const KS: f32 = 55_000.0;
/// Joint anchor spring damping
pub const KD: f32 = 550.0;
/// Per-substep linear velocity retention
pub const LINEAR_DAMPING: f32 = 0.9998;
/// Per-substep angular velocity retention
pub const ANGULAR_DAMPING: f32 = 0.9990;
/// Height of the infinite ground plane
pub const GROUND_Y: f32 = 0.0;
pub const GROUND_FRICTION: f32 = 0.9;
/// Distance above a surface at which a foot still counts as touching it
pub const CONTACT_SLOP: f32 = 0.02;

const EPS: f32 = 1e-9;
const SURFACE_TOLERANCE: f32 = 1e-5;

/// Kinematic state of one body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
}

/// Kinematic state of every body, indexed by [`BodyId`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub bodies: Vec<BodyState>,
}

/// Read-only body data for renderers
#[derive(Debug, Clone)]
pub struct BodyView<'a> {
    pub id: BodyId,
    pub name: &'a str,
    pub position: Vec2,
    pub angle: f32,
    pub shape: Shape,
    pub color: [u8; 4],
    pub is_foot: bool,
    pub foot_contact: bool,
}

/// Read-only joint data for renderers
#[derive(Debug, Clone)]
pub struct JointView<'a> {
    pub id: JointId,
    pub name: &'a str,
    /// World position of the anchor on body A
    pub anchor: Vec2,
    pub angle: f32,
    pub target_angle: f32,
    pub motor: bool,
}

/// Owns bodies, joints and platforms and advances them in time
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    bodies: Vec<RigidBody>,
    joints: Vec<HingeJoint>,
    platforms: Vec<Platform>,
    pub gravity: Vec2,
    /// Uniform acceleration added to every dynamic body
    pub wind: Vec2,
    time: f32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            joints: Vec::new(),
            platforms: Vec::new(),
            gravity: Vec2::new(0.0, -9.81),
            wind: Vec2::ZERO,
            time: 0.0,
        }
    }

    /// Remove all bodies, joints and platforms and rewind the clock
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.joints.clear();
        self.platforms.clear();
        self.time = 0.0;
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.bodies.len());
        self.bodies.push(RigidBody::new(desc));
        id
    }

    pub fn add_joint(&mut self, desc: JointDesc) -> Result<JointId, PhysicsError> {
        for body in [desc.body_a, desc.body_b] {
            if body.0 >= self.bodies.len() {
                return Err(PhysicsError::UnknownBody {
                    joint: desc.name,
                    body,
                });
            }
        }
        if desc.body_a == desc.body_b {
            return Err(PhysicsError::SelfJoint(desc.name));
        }

        let id = JointId(self.joints.len());
        self.joints.push(HingeJoint::new(desc));
        Ok(id)
    }

    pub fn add_platform(&mut self, platform: Platform) {
        self.platforms.push(platform);
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn joints(&self) -> &[HingeJoint] {
        &self.joints
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn joint(&self, id: JointId) -> Option<&HingeJoint> {
        self.joints.get(id.0)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut HingeJoint> {
        self.joints.get_mut(id.0)
    }

    pub fn body_by_name(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().position(|b| b.name == name).map(BodyId)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<JointId> {
        self.joints.iter().position(|j| j.name == name).map(JointId)
    }

    /// Command a motor joint toward `angle` (clamped to its limits when applied)
    pub fn set_joint_target(&mut self, id: JointId, angle: f32) {
        if let Some(joint) = self.joints.get_mut(id.0) {
            joint.target_angle = angle;
        }
    }

    /// Simulated seconds since the last `clear`
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance by `dt` using [`N_SUBS`] substeps
    pub fn step(&mut self, dt: f32) {
        self.advance(dt, N_SUBS);
    }

    /// Advance by `dt` using [`FAST_SUBS`] substeps. Less accurate; used by
    /// optimizer rollouts.
    pub fn fast_step(&mut self, dt: f32) {
        self.advance(dt, FAST_SUBS);
    }

    fn advance(&mut self, dt: f32, substeps: usize) {
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.substep(h);
        }
        self.time += dt;
    }

    fn substep(&mut self, h: f32) {
        self.accumulate_external_forces();
        self.apply_joint_forces();
        self.integrate(h);
        self.resolve_ground_contacts();
        self.resolve_platform_contacts();
        self.update_foot_contacts();
    }

    fn accumulate_external_forces(&mut self) {
        let accel = self.gravity + self.wind;
        for body in &mut self.bodies {
            body.force = if body.is_static {
                Vec2::ZERO
            } else {
                accel * body.mass
            };
            body.torque = 0.0;
        }
    }

    fn apply_joint_forces(&mut self) {
        for joint in &mut self.joints {
            let (ia, ib) = (joint.body_a.0, joint.body_b.0);
            debug_assert!(ia < self.bodies.len() && ib < self.bodies.len());
            let (Some(a), Some(b)) = (self.bodies.get(ia), self.bodies.get(ib)) else {
                continue;
            };

            // Anchor spring-damper pulling the two anchor points together
            let pa = a.world_point(joint.anchor_a);
            let pb = b.world_point(joint.anchor_b);
            let rel_vel = b.velocity_at(pb) - a.velocity_at(pa);
            let spring = KS * (pb - pa) + KD * rel_vel;
            let torque_a = cross(pa - a.position, spring);
            let torque_b = -cross(pb - b.position, spring);

            joint.current_angle = normalize_angle(b.angle - a.angle);
            joint.current_omega = b.angular_velocity - a.angular_velocity;

            let motor_torque = if joint.motor {
                let target = joint.clamp_to_limits(joint.target_angle);
                let error = angle_diff(target, joint.current_angle);
                (joint.kp() * error - joint.damping * joint.current_omega)
                    .clamp(-joint.max_torque, joint.max_torque)
            } else {
                0.0
            };
            joint.motor_torque = motor_torque;

            let a = &mut self.bodies[ia];
            a.force += spring;
            a.torque += torque_a - motor_torque;
            let b = &mut self.bodies[ib];
            b.force -= spring;
            b.torque += torque_b + motor_torque;
        }
    }

    fn integrate(&mut self, h: f32) {
        for body in &mut self.bodies {
            if body.is_static {
                continue;
            }
            body.velocity = (body.velocity + body.force * body.inv_mass * h) * LINEAR_DAMPING;
            body.angular_velocity =
                (body.angular_velocity + body.torque * body.inv_inertia * h) * ANGULAR_DAMPING;
            body.position += body.velocity * h;
            body.angle += body.angular_velocity * h;
        }
    }

    fn resolve_ground_contacts(&mut self) {
        for body in &mut self.bodies {
            if body.is_static {
                continue;
            }
            let mu = (body.friction * GROUND_FRICTION).max(0.0).sqrt();
            let points = body.contact_points();
            let mut patch = ContactPatch::default();
            let mut shift = Vec2::ZERO;
            for point in points.iter() {
                let p = point + shift;
                let depth = GROUND_Y - p.y;
                // Points already lifted flush by an earlier push still take an impulse
                if depth < -SURFACE_TOLERANCE {
                    continue;
                }
                if depth > 0.0 {
                    body.position.y += depth;
                    shift.y += depth;
                }
                patch.push(Vec2::new(p.x, GROUND_Y), Vec2::Y);
            }
            patch.resolve(body, mu);
        }
    }

    fn resolve_platform_contacts(&mut self) {
        if self.platforms.is_empty() {
            return;
        }
        for body in &mut self.bodies {
            if body.is_static {
                continue;
            }
            for platform in &self.platforms {
                let mu = (body.friction * platform.friction).max(0.0).sqrt();
                let points = body.contact_points();
                let mut patch = ContactPatch::default();
                let mut shift = Vec2::ZERO;
                for point in points.iter() {
                    let p = point + shift;
                    // Flush points count, as on the ground
                    let Some((depth, normal)) = platform.contact(p, SURFACE_TOLERANCE) else {
                        continue;
                    };
                    let push = normal * depth;
                    body.position += push;
                    shift += push;
                    patch.push(p + push, normal);
                }
                patch.resolve(body, mu);
            }
        }
    }

    fn update_foot_contacts(&mut self) {
        for body in &mut self.bodies {
            if !body.is_foot {
                body.foot_contact = false;
                continue;
            }
            let platforms = &self.platforms;
            body.foot_contact = body.contact_points().iter().any(|p| {
                p.y <= GROUND_Y + CONTACT_SLOP
                    || platforms.iter().any(|pl| pl.touches_top(p, CONTACT_SLOP))
            });
        }
    }

    /// Capture position, angle and velocities of every body
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            bodies: self
                .bodies
                .iter()
                .map(|b| BodyState {
                    position: b.position,
                    angle: b.angle,
                    velocity: b.velocity,
                    angular_velocity: b.angular_velocity,
                })
                .collect(),
        }
    }

    /// Restore kinematic state captured by [`Self::snapshot`]. Topology is
    /// untouched, so the snapshot must come from a world with the same bodies.
    pub fn restore(&mut self, snapshot: &WorldSnapshot) -> Result<(), PhysicsError> {
        if snapshot.bodies.len() != self.bodies.len() {
            log::warn!(
                "Rejecting snapshot with {} bodies for world with {}",
                snapshot.bodies.len(),
                self.bodies.len()
            );
            return Err(PhysicsError::SnapshotMismatch {
                snapshot: snapshot.bodies.len(),
                world: self.bodies.len(),
            });
        }
        for (body, state) in self.bodies.iter_mut().zip(&snapshot.bodies) {
            body.position = state.position;
            body.angle = state.angle;
            body.velocity = state.velocity;
            body.angular_velocity = state.angular_velocity;
        }
        Ok(())
    }

    pub fn body_views(&self) -> impl Iterator<Item = BodyView<'_>> {
        self.bodies.iter().enumerate().map(|(i, b)| BodyView {
            id: BodyId(i),
            name: &b.name,
            position: b.position,
            angle: b.angle,
            shape: b.shape,
            color: b.color,
            is_foot: b.is_foot,
            foot_contact: b.foot_contact,
        })
    }

    pub fn joint_views(&self) -> impl Iterator<Item = JointView<'_>> {
        self.joints.iter().enumerate().map(|(i, j)| JointView {
            id: JointId(i),
            name: &j.name,
            anchor: self.bodies[j.body_a.0].world_point(j.anchor_a),
            angle: j.current_angle,
            target_angle: j.target_angle,
            motor: j.motor,
        })
    }

    pub fn total_kinetic_energy(&self) -> f32 {
        self.bodies.iter().map(RigidBody::kinetic_energy).sum()
    }
}

/// Contact points of one body against one surface, gathered after push-out
#[derive(Debug, Default)]
struct ContactPatch {
    points: [(Vec2, Vec2); 4],
    len: usize,
}

impl ContactPatch {
    fn push(&mut self, point: Vec2, normal: Vec2) {
        if self.len < self.points.len() {
            self.points[self.len] = (point, normal);
            self.len += 1;
        }
    }

    /// One impulse per distinct normal, applied at the centroid of the points
    /// still moving into the surface, so the outcome does not depend on the
    /// order the corners were visited in.
    fn resolve(&self, body: &mut RigidBody, mu: f32) {
        let contacts = &self.points[..self.len];
        for (i, &(_, normal)) in contacts.iter().enumerate() {
            if contacts[..i].iter().any(|&(_, n)| n == normal) {
                continue;
            }
            let mut sum = Vec2::ZERO;
            let mut count = 0;
            for &(point, n) in contacts {
                if n == normal && body.velocity_at(point).dot(normal) < 0.0 {
                    sum += point;
                    count += 1;
                }
            }
            if count > 0 {
                resolve_contact_impulse(body, sum / count as f32, normal, mu);
            }
        }
    }
}

/// Single-iteration normal + Coulomb friction impulse at a contact point
fn resolve_contact_impulse(body: &mut RigidBody, point: Vec2, normal: Vec2, mu: f32) {
    let r = point - body.position;
    let vn = body.velocity_at(point).dot(normal);
    if vn >= 0.0 {
        return;
    }

    let rn = cross(r, normal);
    let k_normal = body.inv_mass + body.inv_inertia * rn * rn + EPS;
    let jn = -(1.0 + body.restitution) * vn / k_normal;
    body.apply_impulse(normal * jn, point);

    let tangent = normal.perp();
    let vt = body.velocity_at(point).dot(tangent);
    let rt = cross(r, tangent);
    let k_tangent = body.inv_mass + body.inv_inertia * rt * rt + EPS;
    let max_friction = mu * jn;
    let jt = (-vt / k_tangent).clamp(-max_friction, max_friction);
    body.apply_impulse(tangent * jt, point);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(world: &mut PhysicsWorld, name: &str, position: Vec2) -> BodyId {
        world.add_body(BodyDesc::dynamic(
            name,
            position,
            Shape::Circle { radius: 0.1 },
            500.0,
        ))
    }

    #[test]
    fn test_add_joint_rejects_unknown_body() {
        let mut world = PhysicsWorld::new();
        let a = ball(&mut world, "a", Vec2::new(0.0, 1.0));
        let err = world
            .add_joint(JointDesc {
                name: "hinge".into(),
                body_a: a,
                body_b: BodyId(7),
                anchor_a: Vec2::ZERO,
                anchor_b: Vec2::ZERO,
                lower: -1.0,
                upper: 1.0,
                motor: false,
                max_torque: 0.0,
                damping: 0.0,
            })
            .unwrap_err();
        assert_eq!(
            err,
            PhysicsError::UnknownBody {
                joint: "hinge".into(),
                body: BodyId(7)
            }
        );
    }

    #[test]
    fn test_ball_comes_to_rest_on_ground() {
        let mut world = PhysicsWorld::new();
        let id = ball(&mut world, "ball", Vec2::new(0.0, 0.5));
        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let body = world.body(id).unwrap();
        assert!(body.lowest_y() >= -1e-3, "ball sank to {}", body.lowest_y());
        assert!(body.velocity.y.abs() < 0.1);
    }

    #[test]
    fn test_platform_supports_body() {
        let mut world = PhysicsWorld::new();
        world.add_platform(Platform::block(-1.0, 1.0, 0.5, 0.9));
        let id = ball(&mut world, "ball", Vec2::new(0.0, 0.8));
        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let y = world.body(id).unwrap().lowest_y();
        assert!((y - 0.5).abs() < 0.02, "ball should rest on platform top, at {}", y);
    }

    #[test]
    fn test_foot_contact_flag() {
        let mut world = PhysicsWorld::new();
        let mut desc = BodyDesc::dynamic(
            "foot",
            Vec2::new(0.0, 0.3),
            Shape::Rect {
                half_extents: Vec2::new(0.1, 0.05),
            },
            500.0,
        );
        desc.is_foot = true;
        let id = world.add_body(desc);
        world.step(1.0 / 60.0);
        assert!(!world.body(id).unwrap().foot_contact);
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert!(world.body(id).unwrap().foot_contact);
    }

    #[test]
    fn test_motor_drives_joint_toward_target() {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec2::ZERO;
        let half = Vec2::new(0.25, 0.05);
        let mut anchor = BodyDesc::dynamic(
            "base",
            Vec2::new(0.0, 2.0),
            Shape::Rect { half_extents: half },
            1000.0,
        );
        anchor.is_static = true;
        let a = world.add_body(anchor);
        let b = world.add_body(BodyDesc::dynamic(
            "arm",
            Vec2::new(0.5, 2.0),
            Shape::Rect { half_extents: half },
            1000.0,
        ));
        let joint = world
            .add_joint(JointDesc {
                name: "elbow".into(),
                body_a: a,
                body_b: b,
                anchor_a: Vec2::new(0.25, 0.0),
                anchor_b: Vec2::new(-0.25, 0.0),
                lower: -1.0,
                upper: 1.0,
                motor: true,
                max_torque: 200.0,
                damping: 20.0,
            })
            .unwrap();

        // Beyond the upper limit: the motor aims for the clamped target
        world.set_joint_target(joint, 2.0);
        for _ in 0..180 {
            world.step(1.0 / 60.0);
        }
        let angle = world.joint(joint).unwrap().current_angle;
        assert!((angle - 1.0).abs() < 0.1, "joint angle {} should settle near 1.0", angle);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut world = PhysicsWorld::new();
        ball(&mut world, "ball", Vec2::new(0.0, 1.0));
        world.add_platform(Platform::block(0.0, 1.0, 0.2, 0.5));
        world.step(0.1);
        world.clear();
        assert!(world.bodies().is_empty());
        assert!(world.platforms().is_empty());
        assert_eq!(world.time(), 0.0);
    }
}
