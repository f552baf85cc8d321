//! Time-sliced CEM training loop
//!
//! [`Trainer::resume`] advances training by as many physics steps as fit in
//! a wall-clock budget and returns. Call it once per frame; a generation
//! spreads over however many calls it needs. Candidates are evaluated in
//! population order and every episode reuses the same evaluation world.

use std::time::Duration;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use strider_creature::{
    BlueprintId, FitnessTracker, FitnessWeights, JointLimits, PolicyKind, PolicyParams,
    RobotBlueprint, SpawnedRobot, WeightPreset, compute_episode_score, compute_targets,
    extract_observations, spawn_robot,
};
use strider_physics::PhysicsWorld;
use web_time::Instant;

use super::cem::{CandidateResult, CemConfig, CemState, GenerationStats, rank_descending};
use super::curriculum::Curriculum;
use super::evolution::{EvolutionConfig, EvolutionState};
use crate::task::{Task, TaskId};

/// Score given to an episode whose physics produced a non-finite score
pub const FAILURE_SCORE: f32 = -1.0e6;

/// Everything needed to start a training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub task: TaskId,
    pub blueprint: BlueprintId,
    pub policy: PolicyKind,
    pub weights: FitnessWeights,
    /// Simulation step of optimizer rollouts, in seconds
    pub episode_dt: f32,
    /// Default wall-clock budget of one [`Trainer::tick`]
    pub budget: Duration,
    pub cem: CemConfig,
    pub evolution: EvolutionConfig,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            task: TaskId::Flat,
            blueprint: BlueprintId::Biped,
            policy: PolicyKind::Oscillator,
            weights: WeightPreset::Distance.weights(),
            episode_dt: 0.025,
            budget: Duration::from_millis(5),
            cem: CemConfig::default(),
            evolution: EvolutionConfig::default(),
            seed: 42,
        }
    }
}

/// Outcome of one [`Trainer::resume`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenerationStatus {
    /// Training is paused; nothing was done
    Idle,
    /// Budget ran out mid-generation
    InProgress,
    /// The last candidate finished and the generation was finalized
    Completed(GenerationStats),
}

/// Best parameters found across the whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub params: Vec<f32>,
    pub score: f32,
    pub policy: PolicyKind,
    /// Body plan the parameters were scored on
    pub blueprint: RobotBlueprint,
    pub generation: u32,
}

/// Point-in-time view of training for status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingProgress {
    pub generation: u32,
    pub best_score: f32,
    pub current_candidate: usize,
    pub population: usize,
    pub step: u32,
    pub steps_per_episode: u32,
    pub mutations: u32,
    pub curriculum_stage: Option<String>,
}

pub struct Trainer {
    config: TrainerConfig,
    task: Task,
    curriculum: Option<Curriculum>,
    world: PhysicsWorld,
    robot: Option<SpawnedRobot>,
    limits: Vec<JointLimits>,
    /// Parsed parameters of the candidate being evaluated; `None` if invalid
    episode_params: Option<PolicyParams>,
    candidates: Vec<Vec<f32>>,
    scores: Vec<f32>,
    falls: Vec<u32>,
    displacements: Vec<f32>,
    current: usize,
    step: u32,
    tracker: FitnessTracker,
    cem: CemState,
    evolution: EvolutionState,
    champion: Option<Champion>,
    running: bool,
    rng: Xoshiro256PlusPlus,
    last_stats: Option<GenerationStats>,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        let blueprint = config.blueprint.blueprint();
        let mut task = config.task.task();
        let curriculum = (config.task == TaskId::Curriculum).then(Curriculum::standard);
        if let Some(curriculum) = &curriculum {
            curriculum.apply(&mut task);
        }
        let cem = CemState::new(config.policy.param_count(&blueprint), &config.cem);
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

        log::info!(
            "Trainer: {} on {} with {} policy, {} parameters, population {}",
            blueprint.name,
            task.id,
            config.policy,
            cem.param_count(),
            config.cem.pop_size
        );

        Self {
            limits: blueprint.motor_limits(),
            evolution: EvolutionState::new(blueprint),
            config,
            task,
            curriculum,
            world: PhysicsWorld::new(),
            robot: None,
            episode_params: None,
            candidates: Vec::new(),
            scores: Vec::new(),
            falls: Vec::new(),
            displacements: Vec::new(),
            current: 0,
            step: 0,
            tracker: FitnessTracker::default(),
            cem,
            champion: None,
            running: true,
            rng,
            last_stats: None,
        }
    }

    /// Fixed number of steps per episode
    pub fn steps_per_episode(&self) -> u32 {
        ((self.task.episode_time / self.config.episode_dt).round() as u32).max(1)
    }

    /// Resume with the configured budget
    pub fn tick(&mut self) -> GenerationStatus {
        self.resume(self.config.budget)
    }

    /// Run simulation steps until `budget` is spent or the generation ends
    pub fn resume(&mut self, budget: Duration) -> GenerationStatus {
        if !self.running {
            return GenerationStatus::Idle;
        }
        let start = Instant::now();

        if self.candidates.is_empty() {
            self.begin_generation();
        }
        let steps_per_episode = self.steps_per_episode();

        loop {
            if start.elapsed() >= budget {
                return GenerationStatus::InProgress;
            }

            if self.step == 0 {
                self.begin_episode();
            }
            if self.robot.is_some() && self.episode_params.is_some() {
                self.step_episode();
                self.step += 1;
            } else {
                // Nothing to simulate; the episode ends as a failure
                self.step = steps_per_episode;
            }

            if self.step >= steps_per_episode {
                self.finish_episode();
                self.current += 1;
                self.step = 0;
                if self.current >= self.candidates.len() {
                    return GenerationStatus::Completed(self.finalize_generation());
                }
            }
        }
    }

    /// Run until the current generation completes; `None` if paused
    pub fn run_generation(&mut self) -> Option<GenerationStats> {
        loop {
            match self.resume(Duration::MAX) {
                GenerationStatus::Completed(stats) => return Some(stats),
                GenerationStatus::Idle => return None,
                GenerationStatus::InProgress => {}
            }
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn begin_generation(&mut self) {
        let pop = self.config.cem.pop_size.max(1);
        self.candidates = self.cem.sample(pop, &mut self.rng);
        self.scores.clear();
        self.falls.clear();
        self.displacements.clear();
        self.current = 0;
        self.step = 0;
        log::debug!(
            "Sampled generation {} ({} candidates)",
            self.cem.generation + 1,
            pop
        );
    }

    fn begin_episode(&mut self) {
        let blueprint = &self.evolution.blueprint;
        self.world.clear();
        self.world.gravity = self.task.gravity;
        self.world.wind = self.task.wind;
        for platform in &self.task.platforms {
            self.world.add_platform(*platform);
        }

        let spawn_y = self.task.spawn_height(blueprint);
        self.robot = match spawn_robot(&mut self.world, blueprint, self.task.spawn.x, spawn_y) {
            Ok(robot) => Some(robot),
            Err(e) => {
                log::error!("Candidate {}: failed to spawn robot: {}", self.current, e);
                None
            }
        };

        let candidate = &self.candidates[self.current];
        self.episode_params = match PolicyParams::from_flat(
            self.config.policy,
            blueprint.motor_joint_count(),
            candidate,
        ) {
            Ok(params) => Some(params),
            Err(e) => {
                log::error!("Candidate {}: {}", self.current, e);
                None
            }
        };

        self.tracker = match &self.robot {
            Some(robot) => FitnessTracker::start(&self.world, robot),
            None => FitnessTracker::default(),
        };
    }

    fn step_episode(&mut self) {
        let (Some(robot), Some(params)) = (&self.robot, &self.episode_params) else {
            return;
        };
        let dt = self.config.episode_dt;
        let t = self.step as f32 * dt;

        let obs = extract_observations(&self.world, robot);
        let targets = compute_targets(params, &obs, &self.limits, t);
        for (joint, target) in robot.motor_joints.iter().zip(targets) {
            self.world.set_joint_target(*joint, target);
        }
        self.world.fast_step(dt);
        self.tracker.record(&self.world, robot, dt);
    }

    fn finish_episode(&mut self) {
        let (score, displacement, falls) = match (&self.robot, &self.episode_params) {
            (Some(robot), Some(_)) => {
                let result = self.tracker.finish(&self.world, robot);
                let score = compute_episode_score(&result, &self.config.weights);
                if score.is_finite() {
                    (score, result.displacement, result.falls)
                } else {
                    log::warn!(
                        "Candidate {} produced a non-finite score, scoring as failure",
                        self.current
                    );
                    (FAILURE_SCORE, 0.0, result.falls)
                }
            }
            _ => (f32::NEG_INFINITY, 0.0, 0),
        };
        log::debug!(
            "Candidate {}/{}: score {:.3}, dx {:.3}, falls {}",
            self.current + 1,
            self.candidates.len(),
            score,
            displacement,
            falls
        );
        self.scores.push(score);
        self.displacements.push(displacement);
        self.falls.push(falls);
    }

    fn finalize_generation(&mut self) -> GenerationStats {
        let results: Vec<CandidateResult> = self
            .scores
            .iter()
            .zip(&self.displacements)
            .zip(&self.falls)
            .map(|((&score, &displacement), &falls)| CandidateResult {
                score,
                displacement,
                falls,
            })
            .collect();
        let stats = self
            .cem
            .update(&self.candidates, &results, &self.config.cem);

        if let Some(&best) = rank_descending(&self.scores).first() {
            let score = self.scores[best];
            let improved = self.champion.as_ref().map_or(true, |c| score > c.score);
            if improved && score > f32::NEG_INFINITY {
                log::info!(
                    "New champion at generation {}: score {:.3} (was {})",
                    stats.generation,
                    score,
                    self.champion
                        .as_ref()
                        .map_or("none".to_string(), |c| format!("{:.3}", c.score))
                );
                self.champion = Some(Champion {
                    params: self.candidates[best].clone(),
                    score,
                    policy: self.config.policy,
                    blueprint: self.evolution.blueprint.clone(),
                    generation: stats.generation,
                });
            }
        }

        if self.evolution.maybe_evolve(
            &mut self.cem,
            self.config.policy,
            &self.config.evolution,
            &self.config.cem,
            &mut self.rng,
        ) {
            self.limits = self.evolution.blueprint.motor_limits();
        }

        if let Some(curriculum) = &mut self.curriculum {
            curriculum.update(stats.generation, stats.best_score, &mut self.task);
        }

        log::info!(
            "Generation {}: best {:.3}, avg {:.3}, dx {:.3}, falls {}",
            stats.generation,
            stats.best_score,
            stats.avg_score,
            stats.best_displacement,
            stats.falls
        );

        self.candidates.clear();
        self.current = 0;
        self.step = 0;
        self.last_stats = Some(stats);
        stats
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn blueprint(&self) -> &RobotBlueprint {
        &self.evolution.blueprint
    }

    pub fn cem(&self) -> &CemState {
        &self.cem
    }

    pub fn evolution(&self) -> &EvolutionState {
        &self.evolution
    }

    pub fn curriculum(&self) -> Option<&Curriculum> {
        self.curriculum.as_ref()
    }

    pub fn champion(&self) -> Option<&Champion> {
        self.champion.as_ref()
    }

    /// Completed generations
    pub fn generation(&self) -> u32 {
        self.cem.generation
    }

    /// Champion score, or negative infinity before the first generation
    pub fn best_score(&self) -> f32 {
        self.champion.as_ref().map_or(f32::NEG_INFINITY, |c| c.score)
    }

    /// Candidates of the generation in flight; empty between generations
    pub fn candidates(&self) -> &[Vec<f32>] {
        &self.candidates
    }

    /// Scores of the current or most recent generation
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.last_stats.as_ref()
    }

    /// Best score per generation, oldest first, for sparklines
    pub fn score_history(&self) -> Vec<f32> {
        self.cem.history.iter().map(|s| s.best_score).collect()
    }

    /// Evaluation world, for debug rendering of the episode in flight
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn progress(&self) -> TrainingProgress {
        TrainingProgress {
            generation: self.cem.generation,
            best_score: self.best_score(),
            current_candidate: self.current,
            population: self.config.cem.pop_size,
            step: self.step,
            steps_per_episode: self.steps_per_episode(),
            mutations: self.evolution.mutations,
            curriculum_stage: self
                .curriculum
                .as_ref()
                .map(|c| c.current_stage().name.clone()),
        }
    }
}
