//! Training configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `strider.ron` file (if exists), or the file given on the command line
//! 3. Environment variables prefixed with `STRIDER_`
//!
//! Example environment variable: `STRIDER_TRAINING__POPULATION=32`

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use strider_creature::{BlueprintId, PolicyKind, WeightPreset};

use crate::task::TaskId;
use crate::training::{CemConfig, EvolutionConfig, TrainerConfig};

/// Main training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrainingSettings {
    #[serde(default)]
    pub training: TrainingSection,

    #[serde(default)]
    pub task: TaskSection,

    #[serde(default)]
    pub evolution: EvolutionSection,

    #[serde(default)]
    pub cem: CemSection,
}

/// Population and rollout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    pub population: usize,
    pub elites: usize,
    /// Rollout step in seconds
    pub episode_dt: f32,
    /// Wall-clock budget per trainer tick
    pub budget_ms: u64,
    pub seed: u64,
    /// `oscillator`, `reflex` or `hybrid`
    pub policy: String,
    /// `distance`, `stability`, `efficiency` or `all_rounder`
    pub preset: String,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            population: 16,
            elites: 4,
            episode_dt: 0.025,
            budget_ms: 5,
            seed: 42,
            policy: "oscillator".to_string(),
            preset: "distance".to_string(),
        }
    }
}

/// Environment and body plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSection {
    /// `flat`, `ramp`, `steps`, `obstacles`, `wind` or `curriculum`
    pub task: String,
    /// `biped`, `quadruped` or `crawler`
    pub blueprint: String,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            task: "flat".to_string(),
            blueprint: "biped".to_string(),
        }
    }
}

/// Morphology evolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSection {
    pub enabled: bool,
    pub every_n_gen: u32,
    pub retrain_gens: u32,
    pub strength: f32,
}

impl Default for EvolutionSection {
    fn default() -> Self {
        let defaults = EvolutionConfig::default();
        Self {
            enabled: defaults.enabled,
            every_n_gen: defaults.mutate_every_n_gen,
            retrain_gens: defaults.retrain_gens,
            strength: defaults.mutation_strength,
        }
    }
}

/// Search distribution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CemSection {
    pub init_std: f32,
    pub std_min: f32,
}

impl Default for CemSection {
    fn default() -> Self {
        let defaults = CemConfig::default();
        Self {
            init_std: defaults.init_std,
            std_min: defaults.std_min,
        }
    }
}

impl TrainingSettings {
    /// Load configuration with layered sources
    ///
    /// Priority (highest wins):
    /// 1. Compiled defaults (lowest priority)
    /// 2. `strider.ron` file (if exists)
    /// 3. Environment variables prefixed with `STRIDER_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("strider").format(config::FileFormat::Ron).required(false))
    }

    /// Like [`Self::load`] but with an explicit, required config file
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(
            File::from(path)
                .format(config::FileFormat::Ron)
                .required(true),
        )
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = TrainingSettings::default();
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("training.population", defaults.training.population as i64)?
            .set_default("training.elites", defaults.training.elites as i64)?
            .set_default("training.episode_dt", defaults.training.episode_dt as f64)?
            .set_default("training.budget_ms", defaults.training.budget_ms as i64)?
            .set_default("training.seed", defaults.training.seed as i64)?
            .set_default("training.policy", defaults.training.policy)?
            .set_default("training.preset", defaults.training.preset)?
            .set_default("task.task", defaults.task.task)?
            .set_default("task.blueprint", defaults.task.blueprint)?
            .set_default("evolution.enabled", defaults.evolution.enabled)?
            .set_default("evolution.every_n_gen", defaults.evolution.every_n_gen as i64)?
            .set_default("evolution.retrain_gens", defaults.evolution.retrain_gens as i64)?
            .set_default("evolution.strength", defaults.evolution.strength as f64)?
            .set_default("cem.init_std", defaults.cem.init_std as f64)?
            .set_default("cem.std_min", defaults.cem.std_min as f64)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (STRIDER_TRAINING__POPULATION, etc.)
            .add_source(Environment::with_prefix("STRIDER").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Pretty RON rendering, suitable as a starting `strider.ron`
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration")
    }

    /// Resolve string ids and assemble the trainer configuration
    pub fn trainer_config(&self) -> Result<TrainerConfig> {
        let policy: PolicyKind = self
            .training
            .policy
            .parse()
            .map_err(anyhow::Error::msg)?;
        let preset: WeightPreset = self
            .training
            .preset
            .parse()
            .map_err(anyhow::Error::msg)?;
        let task: TaskId = self.task.task.parse().map_err(anyhow::Error::msg)?;
        let blueprint: BlueprintId = self.task.blueprint.parse().map_err(anyhow::Error::msg)?;

        if self.training.population == 0 {
            anyhow::bail!("Population must be at least 1");
        }
        if self.training.episode_dt.is_nan() || self.training.episode_dt <= 0.0 {
            anyhow::bail!(
                "Episode dt must be positive, got {}",
                self.training.episode_dt
            );
        }

        Ok(TrainerConfig {
            task,
            blueprint,
            policy,
            weights: preset.weights(),
            episode_dt: self.training.episode_dt,
            budget: Duration::from_millis(self.training.budget_ms),
            cem: CemConfig {
                pop_size: self.training.population,
                elite_k: self.training.elites.clamp(1, self.training.population),
                init_std: self.cem.init_std,
                std_min: self.cem.std_min,
                ..CemConfig::default()
            },
            evolution: EvolutionConfig {
                enabled: self.evolution.enabled,
                mutate_every_n_gen: self.evolution.every_n_gen,
                retrain_gens: self.evolution.retrain_gens,
                mutation_strength: self.evolution.strength,
            },
            seed: self.training.seed,
        })
    }
}
