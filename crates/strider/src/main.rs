use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use strider::config::TrainingSettings;
use strider::{GenerationStatus, LiveSession, Trainer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Training task: flat, ramp, steps, obstacles, wind, curriculum
    #[arg(long)]
    task: Option<String>,

    /// Robot body plan: biped, quadruped, crawler
    #[arg(long)]
    blueprint: Option<String>,

    /// Control policy: oscillator, reflex, hybrid
    #[arg(long)]
    policy: Option<String>,

    /// Fitness weights: distance, stability, efficiency, all_rounder
    #[arg(long)]
    preset: Option<String>,

    /// Number of generations to train
    #[arg(long, default_value = "50")]
    generations: u32,

    /// Population size per generation
    #[arg(long)]
    population: Option<usize>,

    /// Elite candidates used to refit the search distribution
    #[arg(long)]
    elites: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Mutate the body plan between training cycles
    #[arg(long)]
    evolve: bool,

    /// Config file (RON); defaults to ./strider.ron if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock budget per trainer tick in milliseconds
    #[arg(long)]
    budget_ms: Option<u64>,

    /// Seconds of champion playback after training
    #[arg(long, default_value = "8.0")]
    replay_seconds: f32,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    dump_config: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut settings = match &args.config {
        Some(path) => TrainingSettings::load_from(path)?,
        None => TrainingSettings::load()?,
    };
    apply_overrides(&mut settings, &args);

    if args.dump_config {
        println!("{}", settings.to_ron()?);
        return Ok(());
    }

    let config = settings
        .trainer_config()
        .context("Invalid training configuration")?;

    log::info!("Starting headless training");
    log::info!("  Task: {}", config.task);
    log::info!("  Blueprint: {}", config.blueprint);
    log::info!("  Policy: {}", config.policy);
    log::info!("  Preset: {}", settings.training.preset);
    log::info!("  Generations: {}", args.generations);
    log::info!(
        "  Population: {} (elites {})",
        config.cem.pop_size,
        config.cem.elite_k
    );
    log::info!("  Evolution: {}", config.evolution.enabled);

    let mut trainer = Trainer::new(config);
    run_training(&mut trainer, args.generations);
    replay_champion(&trainer, args.replay_seconds)
}

fn apply_overrides(settings: &mut TrainingSettings, args: &Args) {
    if let Some(task) = &args.task {
        settings.task.task = task.clone();
    }
    if let Some(blueprint) = &args.blueprint {
        settings.task.blueprint = blueprint.clone();
    }
    if let Some(policy) = &args.policy {
        settings.training.policy = policy.clone();
    }
    if let Some(preset) = &args.preset {
        settings.training.preset = preset.clone();
    }
    if let Some(population) = args.population {
        settings.training.population = population;
    }
    if let Some(elites) = args.elites {
        settings.training.elites = elites;
    }
    if let Some(seed) = args.seed {
        settings.training.seed = seed;
    }
    if let Some(budget_ms) = args.budget_ms {
        settings.training.budget_ms = budget_ms;
    }
    if args.evolve {
        settings.evolution.enabled = true;
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Drive the trainer tick by tick, as a frame loop would
fn run_training(trainer: &mut Trainer, generations: u32) {
    let pb = ProgressBar::new(u64::from(generations));
    pb.set_style(progress_style());
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut completed = 0;
    while completed < generations {
        match trainer.tick() {
            GenerationStatus::Completed(stats) => {
                completed += 1;
                pb.inc(1);
                pb.set_message(format!("best {:.2}", trainer.best_score()));
                pb.println(format!(
                    "Gen {:>4}: best {:>8.3}  avg {:>8.3}  dx {:>6.2}  falls {:>3}",
                    stats.generation,
                    stats.best_score,
                    stats.avg_score,
                    stats.best_displacement,
                    stats.falls
                ));
                let progress = trainer.progress();
                if let Some(stage) = progress.curriculum_stage {
                    pb.set_message(format!("best {:.2} [{}]", trainer.best_score(), stage));
                }
            }
            GenerationStatus::InProgress => {}
            GenerationStatus::Idle => break,
        }
    }

    pb.finish_with_message(format!(
        "Training complete! best {:.3}, {} mutations",
        trainer.best_score(),
        trainer.evolution().mutations
    ));
}

fn replay_champion(trainer: &Trainer, seconds: f32) -> anyhow::Result<()> {
    let Some(champion) = trainer.champion() else {
        log::warn!("No champion to replay");
        return Ok(());
    };

    let mut session = LiveSession::new(trainer.task(), champion)?;
    let dt = 1.0 / 60.0;
    let frames = (seconds / dt).round() as u32;
    for _ in 0..frames {
        session.tick(dt);
    }

    log::info!(
        "Champion (generation {}, score {:.3}) walked {:.2} in {:.1}s of live playback",
        champion.generation,
        champion.score,
        session.displacement(),
        session.time()
    );
    Ok(())
}
