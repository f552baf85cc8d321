//! Proprioceptive observations and locomotion fitness
//!
//! Observations are bounded to roughly `[-1, 1]` so policy weights stay on
//! a common scale across blueprints.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use strider_physics::PhysicsWorld;

use crate::builder::SpawnedRobot;
use strider_physics::math::normalize_angle;

/// Root height below which a step counts as fallen
pub const FALL_HEIGHT: f32 = 0.3;
/// Scale applied to raw energy before weighting
pub const ENERGY_SCALE: f32 = 0.1;

/// What a policy sees each step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// `tanh` of the mass-weighted center-of-mass velocity
    pub com_velocity: [f32; 2],
    /// Root angle over pi, in `(-1, 1]`
    pub tilt: f32,
    /// `tanh` of the root angular velocity
    pub root_omega: f32,
    /// Motor joint angles over pi
    pub joint_angles: Vec<f32>,
    /// `tanh` of motor joint relative angular velocity
    pub joint_omegas: Vec<f32>,
    /// 1.0 per foot touching a surface, else 0.0
    pub foot_contacts: Vec<f32>,
}

impl Observation {
    /// Flat vector: com velocity, tilt, root omega, joint angles, joint omegas, feet
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(
            4 + self.joint_angles.len() + self.joint_omegas.len() + self.foot_contacts.len(),
        );
        out.extend_from_slice(&self.com_velocity);
        out.push(self.tilt);
        out.push(self.root_omega);
        out.extend_from_slice(&self.joint_angles);
        out.extend_from_slice(&self.joint_omegas);
        out.extend_from_slice(&self.foot_contacts);
        out
    }

    /// Fraction of feet in contact; 0.0 for footless robots
    pub fn mean_foot_contact(&self) -> f32 {
        if self.foot_contacts.is_empty() {
            return 0.0;
        }
        self.foot_contacts.iter().sum::<f32>() / self.foot_contacts.len() as f32
    }
}

/// Read the robot's state out of `world`.
///
/// The center-of-mass velocity averages every dynamic body in the world,
/// which equals the robot's own when it is the only occupant.
pub fn extract_observations(world: &PhysicsWorld, robot: &SpawnedRobot) -> Observation {
    let (momentum, mass) = world
        .bodies()
        .iter()
        .filter(|b| !b.is_static)
        .fold((glam::Vec2::ZERO, 0.0f32), |(p, m), b| {
            (p + b.velocity * b.mass, m + b.mass)
        });
    let com_velocity = if mass > 0.0 {
        momentum / mass
    } else {
        glam::Vec2::ZERO
    };

    let (tilt, root_omega) = world
        .body(robot.root)
        .map(|root| (normalize_angle(root.angle) / PI, root.angular_velocity.tanh()))
        .unwrap_or((0.0, 0.0));

    let mut joint_angles = Vec::with_capacity(robot.motor_joints.len());
    let mut joint_omegas = Vec::with_capacity(robot.motor_joints.len());
    for id in &robot.motor_joints {
        let (angle, omega) = world
            .joint(*id)
            .map(|j| (j.current_angle / PI, j.current_omega.tanh()))
            .unwrap_or((0.0, 0.0));
        joint_angles.push(angle);
        joint_omegas.push(omega);
    }

    let foot_contacts = robot
        .feet
        .iter()
        .map(|id| match world.body(*id) {
            Some(b) if b.foot_contact => 1.0,
            _ => 0.0,
        })
        .collect();

    Observation {
        com_velocity: [com_velocity.x.tanh(), com_velocity.y.tanh()],
        tilt,
        root_omega,
        joint_angles,
        joint_omegas,
        foot_contacts,
    }
}

/// Accumulates per-episode statistics step by step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessTracker {
    pub start_x: f32,
    pub falls: u32,
    pub energy_used: f32,
    pub tilt_accum: f32,
    pub steps: u32,
}

impl FitnessTracker {
    /// Begin an episode at the robot's current root position
    pub fn start(world: &PhysicsWorld, robot: &SpawnedRobot) -> Self {
        Self {
            start_x: world.body(robot.root).map_or(0.0, |b| b.position.x),
            ..Default::default()
        }
    }

    /// Record one step of length `dt`, after the world advanced
    pub fn record(&mut self, world: &PhysicsWorld, robot: &SpawnedRobot, dt: f32) {
        if let Some(root) = world.body(robot.root) {
            if root.position.y < FALL_HEIGHT {
                self.falls += 1;
            }
            self.tilt_accum += normalize_angle(root.angle).abs();
        }
        self.energy_used += robot
            .motor_joints
            .iter()
            .filter_map(|id| world.joint(*id))
            .map(|j| j.motor_torque.abs() * j.current_omega.abs() * dt)
            .sum::<f32>();
        self.steps += 1;
    }

    /// Close the episode against the robot's final root position
    pub fn finish(&self, world: &PhysicsWorld, robot: &SpawnedRobot) -> EpisodeResult {
        let end_x = world.body(robot.root).map_or(self.start_x, |b| b.position.x);
        let (upright_time, wobble) = if self.steps == 0 {
            (0.0, 0.0)
        } else {
            let steps = self.steps as f32;
            (
                (1.0 - self.tilt_accum / (steps * PI / 2.0)).max(0.0),
                self.tilt_accum / steps,
            )
        };
        EpisodeResult {
            displacement: end_x - self.start_x,
            upright_time,
            energy: self.energy_used,
            falls: self.falls,
            wobble,
        }
    }
}

/// Summary of one finished episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub displacement: f32,
    pub upright_time: f32,
    pub energy: f32,
    pub falls: u32,
    pub wobble: f32,
}

/// Weights of the episode score terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub displacement: f32,
    pub upright: f32,
    pub energy: f32,
    pub falls: f32,
    pub wobble: f32,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        WeightPreset::default().weights()
    }
}

/// Named weight sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeightPreset {
    #[default]
    Distance,
    Stability,
    Efficiency,
    AllRounder,
}

impl WeightPreset {
    pub fn weights(&self) -> FitnessWeights {
        let (displacement, upright, energy, falls, wobble) = match self {
            WeightPreset::Distance => (10.0, 1.0, 0.0002, 0.02, 1.0),
            WeightPreset::Stability => (4.0, 6.0, 0.0002, 0.08, 4.0),
            WeightPreset::Efficiency => (8.0, 2.0, 0.001, 0.04, 1.5),
            WeightPreset::AllRounder => (8.0, 3.0, 0.0005, 0.05, 2.0),
        };
        FitnessWeights {
            displacement,
            upright,
            energy,
            falls,
            wobble,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeightPreset::Distance => "distance",
            WeightPreset::Stability => "stability",
            WeightPreset::Efficiency => "efficiency",
            WeightPreset::AllRounder => "all_rounder",
        }
    }
}

impl std::fmt::Display for WeightPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for WeightPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "distance" => Ok(WeightPreset::Distance),
            "stability" => Ok(WeightPreset::Stability),
            "efficiency" => Ok(WeightPreset::Efficiency),
            "all_rounder" | "allrounder" => Ok(WeightPreset::AllRounder),
            _ => Err(format!(
                "Unknown preset: {}. Valid: distance, stability, efficiency, all_rounder",
                s
            )),
        }
    }
}

/// Weighted episode score; larger is better
pub fn compute_episode_score(result: &EpisodeResult, weights: &FitnessWeights) -> f32 {
    weights.displacement * result.displacement + weights.upright * result.upright_time
        - weights.energy * result.energy * ENERGY_SCALE
        - weights.falls * result.falls as f32
        - weights.wobble * result.wobble
}
