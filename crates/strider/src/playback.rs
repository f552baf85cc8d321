//! Live playback of a trained champion
//!
//! The live world is separate from the trainer's evaluation world. It runs
//! the full-accuracy [`PhysicsWorld::step`] and is driven by the same policy
//! code the optimizer scored.

use anyhow::{Context, Result};
use strider_creature::{
    JointLimits, Observation, PolicyParams, RobotBlueprint, SpawnedRobot, compute_targets,
    extract_observations, spawn_robot,
};
use strider_physics::PhysicsWorld;

use crate::task::Task;
use crate::training::Champion;

/// Write one frame of champion targets onto `robot`'s motor joints.
///
/// Returns the targets that were written.
pub fn apply_champion(
    world: &mut PhysicsWorld,
    robot: &SpawnedRobot,
    blueprint: &RobotBlueprint,
    params: &PolicyParams,
    obs: &Observation,
    t: f32,
) -> Vec<f32> {
    let limits: Vec<JointLimits> = blueprint.motor_limits();
    let targets = compute_targets(params, obs, &limits, t);
    for (joint, target) in robot.motor_joints.iter().zip(&targets) {
        world.set_joint_target(*joint, *target);
    }
    targets
}

fn build_world(task: &Task, blueprint: &RobotBlueprint) -> Result<(PhysicsWorld, SpawnedRobot)> {
    let mut world = PhysicsWorld::new();
    world.gravity = task.gravity;
    world.wind = task.wind;
    for platform in &task.platforms {
        world.add_platform(*platform);
    }
    let robot = spawn_robot(&mut world, blueprint, task.spawn.x, task.spawn_height(blueprint))
        .with_context(|| format!("Failed to spawn {} for playback", blueprint.name))?;
    Ok((world, robot))
}

/// Spawned root x; mutated blueprints may offset the root from the spawn point
fn root_x(world: &PhysicsWorld, robot: &SpawnedRobot, fallback: f32) -> f32 {
    world.body(robot.root).map_or(fallback, |b| b.position.x)
}

/// Owns the display world and plays a champion in it
pub struct LiveSession {
    world: PhysicsWorld,
    robot: SpawnedRobot,
    blueprint: RobotBlueprint,
    params: PolicyParams,
    task: Task,
    time: f32,
    start_x: f32,
}

impl LiveSession {
    pub fn new(task: &Task, champion: &Champion) -> Result<Self> {
        let params = PolicyParams::from_flat(
            champion.policy,
            champion.blueprint.motor_joint_count(),
            &champion.params,
        )
        .context("Champion parameters do not fit its blueprint")?;

        let (world, robot) = build_world(task, &champion.blueprint)?;
        let start_x = root_x(&world, &robot, task.spawn.x);
        Ok(Self {
            world,
            robot,
            blueprint: champion.blueprint.clone(),
            params,
            task: task.clone(),
            time: 0.0,
            start_x,
        })
    }

    /// Rebuild the world and respawn the robot at the task's spawn point
    pub fn reset(&mut self) -> Result<()> {
        let (world, robot) = build_world(&self.task, &self.blueprint)?;
        self.start_x = root_x(&world, &robot, self.task.spawn.x);
        self.world = world;
        self.robot = robot;
        self.time = 0.0;
        Ok(())
    }

    /// Apply the champion's targets and advance the live world by `dt`
    pub fn tick(&mut self, dt: f32) {
        let obs = extract_observations(&self.world, &self.robot);
        apply_champion(
            &mut self.world,
            &self.robot,
            &self.blueprint,
            &self.params,
            &obs,
            self.time,
        );
        self.world.step(dt);
        self.time += dt;
    }

    /// Root x travelled since the last reset
    pub fn displacement(&self) -> f32 {
        self.world
            .body(self.robot.root)
            .map_or(0.0, |b| b.position.x - self.start_x)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn robot(&self) -> &SpawnedRobot {
        &self.robot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_creature::{BlueprintId, PolicyKind};

    fn standing_champion(blueprint: RobotBlueprint) -> Champion {
        let count = PolicyKind::Reflex.param_count(&blueprint);
        Champion {
            params: vec![0.0; count],
            score: 0.0,
            policy: PolicyKind::Reflex,
            blueprint,
            generation: 1,
        }
    }

    #[test]
    fn test_apply_champion_writes_clamped_targets() {
        let blueprint = BlueprintId::Biped.blueprint();
        let mut world = PhysicsWorld::new();
        let robot = spawn_robot(&mut world, &blueprint, 0.0, 1.5).unwrap();
        // Bias every joint far past its limits
        let flat: Vec<f32> = (0..16).map(|i| if i % 4 == 3 { 5.0 } else { 0.0 }).collect();
        let params = PolicyParams::from_flat(PolicyKind::Reflex, 4, &flat).unwrap();
        let obs = extract_observations(&world, &robot);

        let targets = apply_champion(&mut world, &robot, &blueprint, &params, &obs, 0.0);
        let limits = blueprint.motor_limits();
        for ((joint, target), limit) in robot.motor_joints.iter().zip(&targets).zip(&limits) {
            assert_eq!(*target, limit.upper);
            assert_eq!(world.joint(*joint).unwrap().target_angle, limit.upper);
        }
    }

    #[test]
    fn test_live_session_ticks_and_resets() {
        let task = Task::default();
        let mut session =
            LiveSession::new(&task, &standing_champion(BlueprintId::Crawler.blueprint())).unwrap();
        for _ in 0..30 {
            session.tick(1.0 / 60.0);
        }
        assert!((session.time() - 0.5).abs() < 1e-4);
        assert!(session.displacement().is_finite());

        session.reset().unwrap();
        assert_eq!(session.time(), 0.0);
        assert_eq!(session.displacement(), 0.0);
    }

    #[test]
    fn test_displacement_starts_at_shifted_root() {
        let mut blueprint = BlueprintId::Quadruped.blueprint();
        let root = blueprint.root.clone();
        for body in &mut blueprint.bodies {
            if body.name == root {
                body.offset.x += 0.3;
            }
        }

        let task = Task::default();
        let mut session = LiveSession::new(&task, &standing_champion(blueprint)).unwrap();
        let root_x = session.world().body(session.robot().root).unwrap().position.x;
        assert!((root_x - task.spawn.x - 0.3).abs() < 1e-5);
        assert_eq!(session.displacement(), 0.0);

        for _ in 0..30 {
            session.tick(1.0 / 60.0);
        }
        session.reset().unwrap();
        assert_eq!(session.displacement(), 0.0);
    }

    #[test]
    fn test_live_session_rejects_mismatched_champion() {
        let mut champion = standing_champion(BlueprintId::Biped.blueprint());
        champion.params.push(1.0);
        assert!(LiveSession::new(&Task::default(), &champion).is_err());
    }
}
