use std::process::ExitCode;

use genetic_cars::config::{
    ENV_CONFIG_PATH, ENV_GENERATIONS, ENV_MAX_TICKS, ENV_SEED, resolve_env_u64,
};
use genetic_cars::{EventLog, Seed, Settings, Simulation};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_GENERATIONS: u64 = 10;
/// Ten simulated minutes at the default tick.
const DEFAULT_MAX_TICKS: u64 = 36_000;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> genetic_cars::Result<()> {
    let settings = resolve_settings()?;
    settings.log_summary();

    let seed = Seed::parse(&std::env::var(ENV_SEED).unwrap_or_default())?;
    let generations = resolve_env_u64(ENV_GENERATIONS).unwrap_or(DEFAULT_GENERATIONS);
    let max_ticks = resolve_env_u64(ENV_MAX_TICKS).unwrap_or(DEFAULT_MAX_TICKS);
    info!("running {generations} generations, at most {max_ticks} ticks each");

    let mut simulation = Simulation::new(settings, seed, EventLog::new())?;
    for _ in 0..generations {
        match simulation.run_generation(max_ticks)? {
            Some(summary) => match serde_json::to_string(&summary) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!("summary not printable: {err}"),
            },
            None => {
                warn!(
                    "generation {} still had {} cars running after {max_ticks} ticks; stopping",
                    simulation.generation(),
                    simulation.population().live_count()
                );
                break;
            }
        }
        if let Some(id) = simulation.track().winner() {
            info!("finish line reached by car {id}");
        }
    }

    let log = simulation.observer();
    info!(
        "done after {} generations: {} deaths, {} champions",
        simulation.generation(),
        log.deaths(),
        log.champions().count()
    );
    for record in simulation.population().champion_history() {
        info!(
            "champion from generation {}: car {} at {:.2} m",
            record.generation, record.id, record.distance
        );
    }
    Ok(())
}

fn resolve_settings() -> genetic_cars::Result<Settings> {
    match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.trim().is_empty() => {
            info!("loading settings from {path}");
            Ok(Settings::from_json_file(path.trim())?)
        }
        _ => Ok(Settings::default()),
    }
}
