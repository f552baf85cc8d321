//! Training task catalog
//!
//! A task is the environment an episode runs in: gravity, wind, terrain and
//! episode length. Terrain is built from axis-aligned platform blocks.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use strider_creature::RobotBlueprint;
use strider_physics::{GROUND_Y, Platform};

/// Default gravity shared by every task
pub const GRAVITY: Vec2 = Vec2::new(0.0, -9.81);
pub const DEFAULT_EPISODE_TIME: f32 = 4.0;
pub const DEFAULT_SPAWN: Vec2 = Vec2::new(0.0, 1.5);
const TERRAIN_FRICTION: f32 = 0.9;
/// Minimum gap between a robot's lowest body and the ground at spawn
pub const SPAWN_CLEARANCE: f32 = 0.05;

/// Environment an episode runs in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub gravity: Vec2,
    pub wind: Vec2,
    pub platforms: Vec<Platform>,
    /// Simulated seconds per episode
    pub episode_time: f32,
    /// Where the robot root is spawned
    pub spawn: Vec2,
}

impl Task {
    /// Spawn height for `blueprint`: the task's spawn y, raised if a grown
    /// body plan would otherwise start inside the ground
    pub fn spawn_height(&self, blueprint: &RobotBlueprint) -> f32 {
        self.spawn
            .y
            .max(GROUND_Y + SPAWN_CLEARANCE - blueprint.lowest_offset())
    }
}

impl Default for Task {
    fn default() -> Self {
        TaskId::Flat.task()
    }
}

/// Fixed catalog of tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskId {
    #[default]
    Flat,
    /// Shallow staircase approximating an incline
    Ramp,
    /// A few tall steps
    Steps,
    /// Low blocks to step over
    Obstacles,
    /// Flat ground against a headwind
    Wind,
    /// Flat, ramp, steps then obstacles as training improves
    Curriculum,
}

impl TaskId {
    pub fn all() -> &'static [TaskId] {
        &[
            TaskId::Flat,
            TaskId::Ramp,
            TaskId::Steps,
            TaskId::Obstacles,
            TaskId::Wind,
            TaskId::Curriculum,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskId::Flat => "flat",
            TaskId::Ramp => "ramp",
            TaskId::Steps => "steps",
            TaskId::Obstacles => "obstacles",
            TaskId::Wind => "wind",
            TaskId::Curriculum => "curriculum",
        }
    }

    pub fn task(&self) -> Task {
        Task {
            id: *self,
            gravity: GRAVITY,
            wind: self.wind(),
            platforms: self.platforms(),
            episode_time: DEFAULT_EPISODE_TIME,
            spawn: DEFAULT_SPAWN,
        }
    }

    /// Terrain of this task. The curriculum starts on flat ground.
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            TaskId::Flat | TaskId::Wind | TaskId::Curriculum => Vec::new(),
            TaskId::Ramp => (0..12)
                .map(|i| {
                    let x = 1.0 + i as f32 * 0.5;
                    Platform::block(x, x + 0.5, 0.04 * (i + 1) as f32, TERRAIN_FRICTION)
                })
                .collect(),
            TaskId::Steps => (0..5)
                .map(|i| {
                    let x = 1.5 + i as f32;
                    let end = if i == 4 { 20.0 } else { x + 1.0 };
                    Platform::block(x, end, 0.08 * (i + 1) as f32, TERRAIN_FRICTION)
                })
                .collect(),
            TaskId::Obstacles => [1.5, 3.0, 4.5, 6.0]
                .iter()
                .map(|&x| Platform::block(x, x + 0.2, 0.08, TERRAIN_FRICTION))
                .collect(),
        }
    }

    pub fn wind(&self) -> Vec2 {
        match self {
            TaskId::Wind => Vec2::new(-1.5, 0.0),
            _ => Vec2::ZERO,
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(TaskId::Flat),
            "ramp" => Ok(TaskId::Ramp),
            "steps" => Ok(TaskId::Steps),
            "obstacles" => Ok(TaskId::Obstacles),
            "wind" => Ok(TaskId::Wind),
            "curriculum" => Ok(TaskId::Curriculum),
            _ => Err(format!(
                "Unknown task: {}. Valid: flat, ramp, steps, obstacles, wind, curriculum",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_has_no_terrain() {
        let task = TaskId::Flat.task();
        assert!(task.platforms.is_empty());
        assert_eq!(task.wind, Vec2::ZERO);
        assert_eq!(task.spawn, Vec2::new(0.0, 1.5));
    }

    #[test]
    fn test_terrain_starts_ahead_of_spawn() {
        for id in TaskId::all() {
            for platform in id.platforms() {
                let left = platform.center.x - platform.half_extents.x;
                assert!(left >= 1.0, "{} terrain under the spawn point", id);
                assert!((platform.center.y - platform.half_extents.y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_spawn_height_clears_ground() {
        let task = TaskId::Flat.task();
        let biped = strider_creature::BlueprintId::Biped.blueprint();
        assert_eq!(task.spawn_height(&biped), 1.5);

        let mut tall = biped.clone();
        for body in &mut tall.bodies {
            body.offset.y *= 2.0;
        }
        assert!(task.spawn_height(&tall) + tall.lowest_offset() >= SPAWN_CLEARANCE - 1e-5);
    }

    #[test]
    fn test_ramp_rises_monotonically() {
        let tops: Vec<f32> = TaskId::Ramp.platforms().iter().map(|p| p.top()).collect();
        assert!(tops.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_task_id_parse() {
        for id in TaskId::all() {
            assert_eq!(id.name().parse::<TaskId>(), Ok(*id));
        }
        assert!("lava".parse::<TaskId>().is_err());
    }
}
