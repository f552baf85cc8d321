//! Cross-entropy method over flat policy parameter vectors
//!
//! One generation: [`CemState::sample`] a population from a diagonal
//! Gaussian, score every candidate elsewhere, then [`CemState::update`]
//! refits the Gaussian toward the top `elite_k` candidates.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Generations of statistics kept in [`CemState::history`]
pub const HISTORY_CAP: usize = 200;

/// Search hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CemConfig {
    pub pop_size: usize,
    pub elite_k: usize,
    /// Standard deviation of a fresh distribution
    pub init_std: f32,
    /// Floor on every standard deviation
    pub std_min: f32,
    /// Weight of the elite mean in the new mean
    pub mean_momentum: f32,
    /// Weight of the elite std in the new std
    pub std_decay: f32,
}

impl Default for CemConfig {
    fn default() -> Self {
        Self {
            pop_size: 16,
            elite_k: 4,
            init_std: 0.5,
            std_min: 0.05,
            mean_momentum: 0.72,
            std_decay: 0.88,
        }
    }
}

impl CemConfig {
    /// Elite count actually used for a population of `pop` candidates
    pub fn effective_elites(&self, pop: usize) -> usize {
        self.elite_k.clamp(1, pop.max(1))
    }
}

/// Summary of one finished generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    pub best_score: f32,
    /// Mean over candidates with a finite score
    pub avg_score: f32,
    /// Displacement of the generation's best candidate
    pub best_displacement: f32,
    /// Falls of the generation's best candidate
    pub falls: u32,
}

/// Per-candidate results handed to [`CemState::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandidateResult {
    pub score: f32,
    pub displacement: f32,
    pub falls: u32,
}

/// Diagonal Gaussian search distribution plus bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CemState {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    /// Best score ever seen; only replaced by a strictly greater score
    pub best_score: f32,
    pub best_params: Vec<f32>,
    /// Completed generations
    pub generation: u32,
    pub history: VecDeque<GenerationStats>,
}

impl CemState {
    pub fn new(param_count: usize, config: &CemConfig) -> Self {
        Self {
            mean: vec![0.0; param_count],
            std: vec![config.init_std; param_count],
            best_score: f32::NEG_INFINITY,
            best_params: Vec::new(),
            generation: 0,
            history: VecDeque::with_capacity(HISTORY_CAP),
        }
    }

    pub fn param_count(&self) -> usize {
        self.mean.len()
    }

    /// Start a fresh distribution over `param_count` parameters.
    ///
    /// The generation counter and history survive. The mean starts at
    /// `warm_start` when its length matches, else at zero; the best score
    /// is forgotten since it was earned by a different parameterization.
    pub fn reset(&mut self, param_count: usize, warm_start: Option<&[f32]>, config: &CemConfig) {
        self.mean = match warm_start {
            Some(values) if values.len() == param_count => values.to_vec(),
            Some(values) => {
                log::debug!(
                    "Warm start has {} values, distribution needs {}; starting at zero",
                    values.len(),
                    param_count
                );
                vec![0.0; param_count]
            }
            None => vec![0.0; param_count],
        };
        self.std = vec![config.init_std; param_count];
        self.best_score = f32::NEG_INFINITY;
        self.best_params.clear();
    }

    /// Draw `pop_size` candidates from `mean + std * N(0, 1)`
    pub fn sample(&self, pop_size: usize, rng: &mut impl Rng) -> Vec<Vec<f32>> {
        (0..pop_size)
            .map(|_| {
                self.mean
                    .iter()
                    .zip(&self.std)
                    .map(|(m, s)| m + s * standard_normal(rng))
                    .collect()
            })
            .collect()
    }

    /// Refit toward the elites of a scored population and record statistics.
    ///
    /// `candidates` and `results` are parallel; both must be non-empty.
    pub fn update(
        &mut self,
        candidates: &[Vec<f32>],
        results: &[CandidateResult],
        config: &CemConfig,
    ) -> GenerationStats {
        debug_assert_eq!(candidates.len(), results.len());
        let n = candidates.len().min(results.len());
        let scores: Vec<f32> = results[..n].iter().map(|r| r.score).collect();
        let order = rank_descending(&scores);
        let elite = config.effective_elites(n);
        let dims = self.mean.len();

        if n > 0 && dims > 0 {
            let mut elite_mean = vec![0.0f32; dims];
            for &i in &order[..elite] {
                for (acc, v) in elite_mean.iter_mut().zip(&candidates[i]) {
                    *acc += v;
                }
            }
            for v in &mut elite_mean {
                *v /= elite as f32;
            }

            let mut elite_var = vec![0.0f32; dims];
            for &i in &order[..elite] {
                for ((acc, v), m) in elite_var.iter_mut().zip(&candidates[i]).zip(&elite_mean) {
                    *acc += (v - m) * (v - m);
                }
            }

            let m = config.mean_momentum;
            let d = config.std_decay;
            for j in 0..dims {
                let elite_std = (elite_var[j] / elite as f32).sqrt();
                self.mean[j] = m * elite_mean[j] + (1.0 - m) * self.mean[j];
                self.std[j] = (d * elite_std + (1.0 - d) * self.std[j]).max(config.std_min);
            }
        }

        let best = order.first().map(|&i| (i, results[i]));
        if let Some((i, result)) = best {
            if result.score > self.best_score {
                self.best_score = result.score;
                self.best_params = candidates[i].clone();
            }
        }

        let finite: Vec<f32> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        let avg_score = if finite.is_empty() {
            f32::NEG_INFINITY
        } else {
            finite.iter().sum::<f32>() / finite.len() as f32
        };

        self.generation += 1;
        let stats = GenerationStats {
            generation: self.generation,
            best_score: best.map_or(f32::NEG_INFINITY, |(_, r)| r.score),
            avg_score,
            best_displacement: best.map_or(0.0, |(_, r)| r.displacement),
            falls: best.map_or(0, |(_, r)| r.falls),
        };
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(stats);
        stats
    }
}

/// Candidate indices ordered by descending score.
///
/// Ties keep population order and NaN scores rank after everything else.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (scores[a], scores[b]);
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        }
    });
    order
}

/// Standard normal sample via the Box-Muller transform
pub fn standard_normal(rng: &mut impl Rng) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(f32::EPSILON);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}
