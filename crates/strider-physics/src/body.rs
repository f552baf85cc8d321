//! Rigid bodies

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::rotate;

/// Mass reported for static bodies. Their inverse mass is exactly zero.
pub const STATIC_MASS: f32 = 1.0e9;

/// Dense handle of a body inside one [`crate::PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub usize);

/// Collision/mass shape of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Rectangle centered on the body origin, rotated with the body
    Rect { half_extents: Vec2 },
    Circle { radius: f32 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Rect { half_extents } => 4.0 * half_extents.x * half_extents.y,
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
        }
    }

    /// Moment of inertia about the centroid for the given mass
    pub fn inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Rect { half_extents } => {
                let w = 2.0 * half_extents.x;
                let h = 2.0 * half_extents.y;
                mass * (w * w + h * h) / 12.0
            }
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
        }
    }
}

/// Everything needed to create a body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDesc {
    pub name: String,
    pub position: Vec2,
    pub angle: f32,
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub is_foot: bool,
    pub color: [u8; 4],
}

impl BodyDesc {
    /// Dynamic body with sensible contact defaults
    pub fn dynamic(name: impl Into<String>, position: Vec2, shape: Shape, density: f32) -> Self {
        Self {
            name: name.into(),
            position,
            angle: 0.0,
            shape,
            density,
            friction: 0.8,
            restitution: 0.0,
            is_static: false,
            is_foot: false,
            color: [200, 200, 200, 255],
        }
    }
}

/// A rigid body owned by a physics world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub name: String,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub shape: Shape,
    pub mass: f32,
    pub inv_mass: f32,
    pub inertia: f32,
    pub inv_inertia: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub is_foot: bool,
    /// Recomputed every substep for foot bodies
    pub foot_contact: bool,
    pub color: [u8; 4],
    #[serde(skip)]
    pub(crate) force: Vec2,
    #[serde(skip)]
    pub(crate) torque: f32,
}

impl RigidBody {
    pub fn new(desc: BodyDesc) -> Self {
        let (mass, inv_mass, inertia, inv_inertia) = if desc.is_static {
            (STATIC_MASS, 0.0, STATIC_MASS, 0.0)
        } else {
            let mass = (desc.density * desc.shape.area()).max(1e-6);
            let inertia = desc.shape.inertia(mass).max(1e-6);
            (mass, 1.0 / mass, inertia, 1.0 / inertia)
        };

        Self {
            name: desc.name,
            position: desc.position,
            angle: desc.angle,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            shape: desc.shape,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            friction: desc.friction,
            restitution: desc.restitution,
            is_static: desc.is_static,
            is_foot: desc.is_foot,
            foot_contact: false,
            color: desc.color,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    /// Transform a body-local point to world space
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + rotate(local, self.angle)
    }

    /// Velocity of the material point at world position `point`
    pub fn velocity_at(&self, point: Vec2) -> Vec2 {
        let r = point - self.position;
        self.velocity + crate::math::cross_scalar(self.angular_velocity, r)
    }

    /// Apply an impulse at a world point
    pub fn apply_impulse(&mut self, impulse: Vec2, point: Vec2) {
        let r = point - self.position;
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += crate::math::cross(r, impulse) * self.inv_inertia;
    }

    /// Points used for ground and platform contact: the four rotated corners
    /// of a rectangle, or the lowest point of a circle.
    pub fn contact_points(&self) -> ContactPoints {
        match self.shape {
            Shape::Rect { half_extents } => {
                let h = half_extents;
                ContactPoints {
                    points: [
                        self.world_point(Vec2::new(-h.x, -h.y)),
                        self.world_point(Vec2::new(h.x, -h.y)),
                        self.world_point(Vec2::new(h.x, h.y)),
                        self.world_point(Vec2::new(-h.x, h.y)),
                    ],
                    len: 4,
                }
            }
            Shape::Circle { radius } => ContactPoints {
                points: [self.position - Vec2::new(0.0, radius), Vec2::ZERO, Vec2::ZERO, Vec2::ZERO],
                len: 1,
            },
        }
    }

    /// Lowest y coordinate of the body's contact points
    pub fn lowest_y(&self) -> f32 {
        self.contact_points()
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min)
    }

    pub fn kinetic_energy(&self) -> f32 {
        if self.is_static {
            return 0.0;
        }
        0.5 * self.mass * self.velocity.length_squared()
            + 0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }
}

/// Fixed-capacity list of contact points (no allocation in the solver loop)
#[derive(Debug, Clone, Copy)]
pub struct ContactPoints {
    points: [Vec2; 4],
    len: usize,
}

impl ContactPoints {
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.points[..self.len].iter().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
