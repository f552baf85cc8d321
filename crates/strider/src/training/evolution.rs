//! Periodic morphology mutation between CEM cycles

use rand::Rng;
use serde::{Deserialize, Serialize};
use strider_creature::{PolicyKind, RobotBlueprint, mutate_morphology};

use super::cem::{CemConfig, CemState};

/// Scale applied to the previous best parameters when warm-starting
pub const WARM_START_SCALE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub enabled: bool,
    /// Mutate on generations divisible by this
    pub mutate_every_n_gen: u32,
    /// Generations a body plan trains before it may mutate again
    pub retrain_gens: u32,
    pub mutation_strength: f32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mutate_every_n_gen: 8,
            retrain_gens: 3,
            mutation_strength: 0.15,
        }
    }
}

/// Active body plan and mutation bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionState {
    pub blueprint: RobotBlueprint,
    /// CEM generation at which the blueprint last changed
    pub last_mutation_gen: u32,
    pub mutations: u32,
}

impl EvolutionState {
    pub fn new(blueprint: RobotBlueprint) -> Self {
        Self {
            blueprint,
            last_mutation_gen: 0,
            mutations: 0,
        }
    }

    /// Whether the generation just completed should trigger a mutation
    pub fn is_due(&self, generation: u32, config: &EvolutionConfig) -> bool {
        config.enabled
            && config.mutate_every_n_gen > 0
            && generation > 0
            && generation % config.mutate_every_n_gen == 0
            && generation.saturating_sub(self.last_mutation_gen) >= config.retrain_gens
    }

    /// Mutate the blueprint and restart `cem` for it when due.
    ///
    /// Returns `true` if the body plan changed. The new search mean is
    /// `WARM_START_SCALE * best_params` when the parameter count is
    /// unchanged, otherwise zero.
    pub fn maybe_evolve(
        &mut self,
        cem: &mut CemState,
        policy: PolicyKind,
        config: &EvolutionConfig,
        cem_config: &CemConfig,
        rng: &mut impl Rng,
    ) -> bool {
        if !self.is_due(cem.generation, config) {
            return false;
        }

        let mutated = mutate_morphology(&self.blueprint, config.mutation_strength, rng);
        let param_count = policy.param_count(&mutated);
        let warm: Vec<f32> = cem.best_params.iter().map(|p| p * WARM_START_SCALE).collect();
        let warm_start = (!warm.is_empty()).then_some(warm.as_slice());
        cem.reset(param_count, warm_start, cem_config);

        self.blueprint = mutated;
        self.last_mutation_gen = cem.generation;
        self.mutations += 1;
        log::info!(
            "Mutated {} at generation {} (mutation #{}), {} parameters",
            self.blueprint.name,
            cem.generation,
            self.mutations,
            param_count
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use strider_creature::BlueprintId;

    fn enabled() -> EvolutionConfig {
        EvolutionConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_due_schedule() {
        let state = EvolutionState::new(BlueprintId::Biped.blueprint());
        let config = enabled();
        assert!(!state.is_due(0, &config));
        assert!(!state.is_due(7, &config));
        assert!(state.is_due(8, &config));
        assert!(!state.is_due(8, &EvolutionConfig::default()));

        let recent = EvolutionState {
            last_mutation_gen: 6,
            ..state
        };
        assert!(!recent.is_due(8, &config));
        assert!(recent.is_due(16, &config));
    }

    #[test]
    fn test_evolve_warm_starts_at_half_best() {
        let cem_config = CemConfig::default();
        let bp = BlueprintId::Biped.blueprint();
        let count = PolicyKind::Oscillator.param_count(&bp);
        let mut cem = CemState::new(count, &cem_config);
        cem.generation = 8;
        cem.best_params = vec![2.0; count];
        cem.best_score = 5.0;

        let mut state = EvolutionState::new(bp.clone());
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let changed = state.maybe_evolve(
            &mut cem,
            PolicyKind::Oscillator,
            &enabled(),
            &cem_config,
            &mut rng,
        );

        assert!(changed);
        assert_ne!(state.blueprint, bp);
        assert_eq!(state.last_mutation_gen, 8);
        assert_eq!(state.mutations, 1);
        assert_eq!(cem.mean, vec![1.0; count]);
        assert_eq!(cem.generation, 8);
        assert_eq!(cem.best_score, f32::NEG_INFINITY);
    }

    #[test]
    fn test_not_due_leaves_everything_alone() {
        let cem_config = CemConfig::default();
        let bp = BlueprintId::Crawler.blueprint();
        let mut cem = CemState::new(PolicyKind::Reflex.param_count(&bp), &cem_config);
        cem.generation = 5;
        let before = cem.clone();
        let mut state = EvolutionState::new(bp);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        assert!(!state.maybe_evolve(&mut cem, PolicyKind::Reflex, &enabled(), &cem_config, &mut rng));
        assert_eq!(cem, before);
    }
}
