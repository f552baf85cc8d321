//! Curriculum for the `curriculum` task
//!
//! Training starts on flat ground and moves through harder terrain once
//! each stage has been trained long enough and, for some stages, the best
//! score clears a threshold.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// Ordered training stages, easiest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub stages: Vec<CurriculumStage>,
    current_stage: usize,
    /// Generation at which the current stage began
    stage_started_gen: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumStage {
    pub name: String,
    /// Terrain and wind come from this task
    pub terrain: TaskId,
    /// Generations before advancement is considered
    pub min_generations: u32,
    pub advancement: AdvancementCriteria,
}

/// When a stage hands over to the next one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdvancementCriteria {
    /// After `min_generations`
    Automatic,
    /// After `min_generations`, once the generation's best score reaches `target`
    ScoreThreshold { target: f32 },
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::standard()
    }
}

impl Curriculum {
    /// Flat → ramp → steps → obstacles
    pub fn standard() -> Self {
        let stage = |name: &str,
                     terrain: TaskId,
                     min_generations: u32,
                     advancement: AdvancementCriteria| CurriculumStage {
            name: name.to_string(),
            terrain,
            min_generations,
            advancement,
        };
        Self::new(vec![
            stage("Flat Ground", TaskId::Flat, 10, AdvancementCriteria::Automatic),
            stage(
                "Ramp",
                TaskId::Ramp,
                15,
                AdvancementCriteria::ScoreThreshold { target: 5.0 },
            ),
            stage(
                "Steps",
                TaskId::Steps,
                20,
                AdvancementCriteria::ScoreThreshold { target: 8.0 },
            ),
            stage("Obstacles", TaskId::Obstacles, 0, AdvancementCriteria::Automatic),
        ])
    }

    /// Curriculum over `stages`; an empty list falls back to flat ground only
    pub fn new(mut stages: Vec<CurriculumStage>) -> Self {
        if stages.is_empty() {
            log::warn!("Empty curriculum, training on flat ground only");
            stages.push(CurriculumStage {
                name: "Flat Ground".to_string(),
                terrain: TaskId::Flat,
                min_generations: 0,
                advancement: AdvancementCriteria::Automatic,
            });
        }
        Self {
            stages,
            current_stage: 0,
            stage_started_gen: 0,
        }
    }

    pub fn current_stage(&self) -> &CurriculumStage {
        &self.stages[self.current_stage]
    }

    pub fn current_stage_index(&self) -> usize {
        self.current_stage
    }

    /// On the final stage
    pub fn is_complete(&self) -> bool {
        self.current_stage + 1 >= self.stages.len()
    }

    /// Reason to advance after `generation` finished with `best_score`, if any
    pub fn should_advance(&self, generation: u32, best_score: f32) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        let stage = self.current_stage();
        let trained = generation.saturating_sub(self.stage_started_gen);
        if trained < stage.min_generations {
            return None;
        }
        match stage.advancement {
            AdvancementCriteria::Automatic => Some("minimum generations completed".to_string()),
            AdvancementCriteria::ScoreThreshold { target } if best_score >= target => Some(
                format!("score {:.2} >= target {:.2}", best_score, target),
            ),
            AdvancementCriteria::ScoreThreshold { .. } => None,
        }
    }

    /// Advance if due, rewriting `task`'s terrain and wind for the new stage.
    /// Returns `true` when the stage changed.
    pub fn update(&mut self, generation: u32, best_score: f32, task: &mut Task) -> bool {
        let Some(reason) = self.should_advance(generation, best_score) else {
            return false;
        };
        self.current_stage += 1;
        self.stage_started_gen = generation;
        self.apply(task);
        log::info!(
            "Curriculum advanced to stage {} ({}): {}",
            self.current_stage + 1,
            self.current_stage().name,
            reason
        );
        true
    }

    /// Copy the current stage's terrain and wind into `task`
    pub fn apply(&self, task: &mut Task) {
        let terrain = self.current_stage().terrain;
        task.platforms = terrain.platforms();
        task.wind = terrain.wind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_starts_flat() {
        let curriculum = Curriculum::standard();
        assert_eq!(curriculum.current_stage_index(), 0);
        assert_eq!(curriculum.current_stage().terrain, TaskId::Flat);
        assert!(!curriculum.is_complete());
    }

    #[test]
    fn test_automatic_waits_for_min_generations() {
        let curriculum = Curriculum::standard();
        assert!(curriculum.should_advance(9, 0.0).is_none());
        assert!(curriculum.should_advance(10, 0.0).is_some());
    }

    #[test]
    fn test_threshold_swaps_terrain() {
        let mut curriculum = Curriculum::standard();
        let mut task = TaskId::Curriculum.task();
        assert!(curriculum.update(10, 0.0, &mut task));
        assert_eq!(task.platforms, TaskId::Ramp.platforms());

        // Ramp needs 15 generations and a score of 5
        assert!(!curriculum.update(30, 4.9, &mut task));
        assert!(!curriculum.update(20, 9.0, &mut task));
        assert!(curriculum.update(25, 5.0, &mut task));
        assert_eq!(curriculum.current_stage().terrain, TaskId::Steps);
        assert_eq!(task.platforms, TaskId::Steps.platforms());
    }

    #[test]
    fn test_final_stage_never_advances() {
        let mut curriculum = Curriculum::new(Vec::new());
        assert!(curriculum.is_complete());
        let mut task = Task::default();
        assert!(!curriculum.update(1000, 1e6, &mut task));
    }
}
