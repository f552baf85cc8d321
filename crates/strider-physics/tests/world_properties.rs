//! Regression tests for the integrator, contacts, joint springs and snapshots

use glam::Vec2;
use strider_physics::{BodyDesc, BodyId, JointDesc, PhysicsWorld, Platform, Shape};

const DT: f32 = 1.0 / 60.0;

fn plank(name: &str, position: Vec2) -> BodyDesc {
    BodyDesc::dynamic(
        name,
        position,
        Shape::Rect {
            half_extents: Vec2::new(0.5, 0.1),
        },
        100.0,
    )
}

/// Two planks pinned end to end along the x axis, far above the ground
fn pinned_pair(world: &mut PhysicsWorld) -> (BodyId, BodyId) {
    let a = world.add_body(plank("left", Vec2::new(0.0, 5.0)));
    let b = world.add_body(plank("right", Vec2::new(1.0, 5.0)));
    world
        .add_joint(JointDesc {
            name: "pin".into(),
            body_a: a,
            body_b: b,
            anchor_a: Vec2::new(0.5, 0.0),
            anchor_b: Vec2::new(-0.5, 0.0),
            lower: -1.0,
            upper: 1.0,
            motor: false,
            max_torque: 0.0,
            damping: 0.0,
        })
        .unwrap();
    (a, b)
}

// ============================================================================
// Mass invariants
// ============================================================================

#[test]
fn test_static_and_dynamic_mass_invariants() {
    let mut world = PhysicsWorld::new();
    let mut wall = plank("wall", Vec2::new(3.0, 1.0));
    wall.is_static = true;
    world.add_body(wall);
    world.add_body(plank("plank", Vec2::new(0.0, 1.0)));
    world.add_body(BodyDesc::dynamic(
        "ball",
        Vec2::new(-2.0, 1.0),
        Shape::Circle { radius: 0.2 },
        300.0,
    ));

    for _ in 0..30 {
        world.step(DT);
    }

    for body in world.bodies() {
        if body.is_static {
            assert_eq!(body.inv_mass, 0.0);
            assert_eq!(body.inv_inertia, 0.0);
        } else {
            assert!(body.mass > 0.0 && body.inertia > 0.0, "{} has no mass", body.name);
            assert!(body.inv_mass > 0.0 && body.inv_inertia > 0.0);
        }
    }
}

// ============================================================================
// Integration
// ============================================================================

#[test]
fn test_free_fall_matches_closed_form() {
    let mut world = PhysicsWorld::new();
    let y0 = 100.0;
    let id = world.add_body(plank("falling", Vec2::new(0.0, y0)));

    let steps = 60;
    for _ in 0..steps {
        world.step(DT);
    }

    let t = steps as f32 * DT;
    let expected_drop = 0.5 * 9.81 * t * t;
    let drop = y0 - world.body(id).unwrap().position.y;
    // Drag and substep discretization keep us within a few percent
    assert!(
        (drop - expected_drop).abs() < 0.05 * expected_drop,
        "dropped {} but closed form says {}",
        drop,
        expected_drop
    );
    assert!(drop <= expected_drop * 1.01, "drag must not speed the fall up");
}

#[test]
fn test_free_body_never_gains_energy_without_gravity() {
    let mut world = PhysicsWorld::new();
    world.gravity = Vec2::ZERO;
    let id = world.add_body(plank("drifter", Vec2::new(0.0, 10.0)));
    {
        let body = world.body_mut(id).unwrap();
        body.velocity = Vec2::new(3.0, 1.0);
        body.angular_velocity = 2.0;
    }

    let mut previous = world.total_kinetic_energy();
    for _ in 0..200 {
        world.step(DT);
        let energy = world.total_kinetic_energy();
        assert!(energy <= previous, "energy grew from {} to {}", previous, energy);
        previous = energy;
    }
    assert!(previous > 0.0);
}

// ============================================================================
// Wind and Contact
// ============================================================================

#[test]
fn test_wind_accelerates_dynamic_body() {
    let mut world = PhysicsWorld::new();
    world.gravity = Vec2::ZERO;
    world.wind = Vec2::new(2.0, 0.0);
    let id = world.add_body(plank("kite", Vec2::new(0.0, 10.0)));
    let mut anchor = plank("post", Vec2::new(5.0, 10.0));
    anchor.is_static = true;
    let post = world.add_body(anchor);

    for _ in 0..60 {
        world.step(DT);
    }

    let body = world.body(id).unwrap();
    // One second at 2 m/s^2, less a little drag
    assert!(
        body.velocity.x > 1.5 && body.velocity.x <= 2.0,
        "wind left vx at {}",
        body.velocity.x
    );
    assert!(body.position.x > 0.5 && body.position.x <= 1.0);
    assert_eq!(body.velocity.y, 0.0);
    assert_eq!(world.body(post).unwrap().position, Vec2::new(5.0, 10.0));
}

#[test]
fn test_side_face_pushes_body_back_out() {
    let mut world = PhysicsWorld::new();
    world.gravity = Vec2::ZERO;
    world.add_platform(Platform::block(1.0, 3.0, 0.5, 0.9));
    let id = world.add_body(BodyDesc::dynamic(
        "crate",
        Vec2::new(0.8, 0.25),
        Shape::Rect {
            half_extents: Vec2::new(0.05, 0.05),
        },
        100.0,
    ));
    world.body_mut(id).unwrap().velocity = Vec2::new(2.0, 0.0);

    for _ in 0..60 {
        world.step(DT);
    }

    let body = world.body(id).unwrap();
    let leading_edge = body
        .contact_points()
        .iter()
        .map(|p| p.x)
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(leading_edge <= 1.0 + 1e-3, "crate sank into the wall to x = {}", leading_edge);
    // Stopped at the wall, not lifted onto the top at y = 0.5
    assert!((body.position.y - 0.25).abs() < 0.05, "crate ended at y = {}", body.position.y);
    assert!(body.velocity.x.abs() < 1e-2);
    assert!(body.angle.abs() < 0.05);
}

// ============================================================================
// Joints
// ============================================================================

#[test]
fn test_joint_recovers_rest_length_after_impulse() {
    let mut world = PhysicsWorld::new();
    world.gravity = Vec2::ZERO;
    let (a, b) = pinned_pair(&mut world);
    let rest = 1.0;

    let right = world.body_mut(b).unwrap();
    let position = right.position;
    right.apply_impulse(Vec2::new(10.0, 0.0), position);

    // The impulse visibly stretches the hinge first
    world.step(DT);
    let stretched = world.body(b).unwrap().position.x - world.body(a).unwrap().position.x;
    assert!(stretched > rest);

    for _ in 0..240 {
        world.step(DT);
    }

    let separation = (world.body(b).unwrap().position - world.body(a).unwrap().position).length();
    assert!(
        (separation - rest).abs() < 0.01 * rest,
        "separation {} should settle within 1% of {}",
        separation,
        rest
    );
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_restore_is_bit_identical() {
    let mut world = PhysicsWorld::new();
    pinned_pair(&mut world);
    for _ in 0..17 {
        world.step(DT);
    }

    let before = world.snapshot();
    world.restore(&before).unwrap();
    let after = world.snapshot();

    for (x, y) in before.bodies.iter().zip(&after.bodies) {
        assert_eq!(x.position.x.to_bits(), y.position.x.to_bits());
        assert_eq!(x.position.y.to_bits(), y.position.y.to_bits());
        assert_eq!(x.angle.to_bits(), y.angle.to_bits());
        assert_eq!(x.velocity.x.to_bits(), y.velocity.x.to_bits());
        assert_eq!(x.velocity.y.to_bits(), y.velocity.y.to_bits());
        assert_eq!(x.angular_velocity.to_bits(), y.angular_velocity.to_bits());
    }
}

#[test]
fn test_restore_rewinds_simulation() {
    let mut world = PhysicsWorld::new();
    pinned_pair(&mut world);
    let start = world.snapshot();
    for _ in 0..30 {
        world.step(DT);
    }
    assert_ne!(world.snapshot(), start);

    world.restore(&start).unwrap();
    assert_eq!(world.snapshot(), start);
}

#[test]
fn test_restore_rejects_foreign_snapshot() {
    let mut world = PhysicsWorld::new();
    pinned_pair(&mut world);
    let snapshot = world.snapshot();

    let mut other = PhysicsWorld::new();
    other.add_body(plank("lonely", Vec2::ZERO));
    assert!(other.restore(&snapshot).is_err());
}
