//! Catalog robots behave sensibly once spawned into a world

use strider_creature::{
    BlueprintId, FitnessTracker, PolicyKind, PolicyParams, compute_targets, extract_observations,
    spawn_robot,
};
use strider_physics::PhysicsWorld;

const DT: f32 = 0.025;

#[test]
fn test_param_count_identities() {
    for id in BlueprintId::all() {
        let bp = id.blueprint();
        let osc = PolicyKind::Oscillator.param_count(&bp);
        let reflex = PolicyKind::Reflex.param_count(&bp);
        let hybrid = PolicyKind::Hybrid.param_count(&bp);
        assert_eq!(hybrid, osc + reflex + bp.motor_joint_count(), "{}", id);
    }

    let biped = BlueprintId::Biped.blueprint();
    assert_eq!(PolicyKind::Oscillator.param_count(&biped), 13);
    assert_eq!(PolicyKind::Reflex.param_count(&biped), 16);
    assert_eq!(PolicyKind::Hybrid.param_count(&biped), 33);
}

#[test]
fn test_quadruped_feet_touch_down_within_ten_steps() {
    let mut world = PhysicsWorld::new();
    let bp = BlueprintId::Quadruped.blueprint();
    let robot = spawn_robot(&mut world, &bp, 0.0, 1.5).unwrap();
    assert_eq!(robot.feet.len(), 4);
    assert!(bp.bodies.iter().filter(|b| b.is_foot).all(|b| b.friction >= 0.5));

    let mut touched = false;
    for _ in 0..10 {
        world.step(DT);
        if extract_observations(&world, &robot)
            .foot_contacts
            .iter()
            .all(|c| *c > 0.5)
        {
            touched = true;
            break;
        }
    }
    assert!(touched, "quadruped feet did not all reach the ground in 10 steps");
}

#[test]
fn test_every_catalog_robot_stays_finite_under_fast_step() {
    for id in BlueprintId::all() {
        let mut world = PhysicsWorld::new();
        let bp = id.blueprint();
        let robot = spawn_robot(&mut world, &bp, 0.0, 1.5).unwrap();
        let limits = bp.motor_limits();
        let n = bp.motor_joint_count();

        // A lively gait: every joint swinging at full range
        let mut flat = vec![0.0; PolicyKind::Oscillator.param_count(&bp)];
        for j in 0..n {
            flat[3 * j + 1] = 1.0;
            flat[3 * j + 2] = j as f32;
        }
        flat[3 * n] = 1.5;
        let params = PolicyParams::from_flat(PolicyKind::Oscillator, n, &flat).unwrap();

        let mut tracker = FitnessTracker::start(&world, &robot);
        for step in 0..160 {
            let obs = extract_observations(&world, &robot);
            let targets = compute_targets(&params, &obs, &limits, step as f32 * DT);
            for (joint, target) in robot.motor_joints.iter().zip(targets) {
                world.set_joint_target(*joint, target);
            }
            world.fast_step(DT);
            tracker.record(&world, &robot, DT);
        }

        for body in world.bodies() {
            assert!(
                body.position.is_finite() && body.angle.is_finite(),
                "{} blew up: {} at {:?}",
                id,
                body.name,
                body.position
            );
            assert!(body.position.y > -0.5, "{}: {} fell through the ground", id, body.name);
        }
        let result = tracker.finish(&world, &robot);
        assert!(result.displacement.is_finite());
        assert!(result.energy.is_finite() && result.energy >= 0.0);
    }
}

#[test]
fn test_idle_robots_settle_under_fast_step() {
    for id in [BlueprintId::Quadruped, BlueprintId::Crawler] {
        let mut world = PhysicsWorld::new();
        let bp = id.blueprint();
        let robot = spawn_robot(&mut world, &bp, 0.0, 1.5).unwrap();
        let start_x = world.body(robot.root).unwrap().position.x;

        // Every motor holds its neutral target for ten seconds
        let mut max_drift = 0.0f32;
        let mut late_energy = 0.0f32;
        for step in 0..400 {
            world.fast_step(DT);
            let root = world.body(robot.root).unwrap();
            max_drift = max_drift.max((root.position.x - start_x).abs());
            if step >= 360 {
                late_energy = late_energy.max(world.total_kinetic_energy());
            }
        }

        assert!(max_drift < 0.05, "{} crept {} while idle", id, max_drift);
        assert!(late_energy < 5.0, "{} still carries {} J after ten seconds", id, late_energy);
    }
}
