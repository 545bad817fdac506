//! Fixed-step driver tying the physics world, track and population
//! together. Single threaded: every call runs to completion before it
//! returns, and the same seed with the same tick sequence reproduces a run.

use rand::rngs::SmallRng;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Error, OperatorError};
use crate::events::SimulationObserver;
use crate::operators::GeneticOperators;
use crate::physics::PhysicsWorld;
use crate::population::{GenerationSummary, Population};
use crate::seed::Seed;
use crate::track::Track;

pub struct Simulation<O: SimulationObserver = ()> {
    settings: Settings,
    seed: Seed,
    rng: SmallRng,
    world: PhysicsWorld,
    track: Track,
    population: Population,
    observer: O,
    paused: bool,
    accumulator: f32,
    ticks: u64,
}

impl<O: SimulationObserver> Simulation<O> {
    /// Validates `settings`, builds the track and a first random
    /// population.
    pub fn new(settings: Settings, seed: Seed, observer: O) -> Result<Self, Error> {
        settings.validate()?;
        info!("seed {seed}");
        let mut rng = seed.rng();
        let mut world = PhysicsWorld::new(&settings.physics);
        let track = Track::generate(&settings.track, &mut world, &mut rng);
        let population = Population::new(&settings, start_position(&settings, &track));

        let mut simulation = Self {
            settings,
            seed,
            rng,
            world,
            track,
            population,
            observer,
            paused: false,
            accumulator: 0.0,
            ticks: 0,
        };
        simulation.new_population()?;
        Ok(simulation)
    }

    /// One fixed physics tick. Returns the summary of a generation that
    /// ended during it. Does nothing while paused.
    pub fn step(&mut self) -> Result<Option<GenerationSummary>, Error> {
        if self.paused {
            return Ok(None);
        }
        let dt = self.settings.physics.tick_seconds;
        self.population.pre_step(&mut self.world, dt)?;
        for contact in self.world.step(dt) {
            if let Some(id) = self.track.handle_contact(&contact) {
                self.observer.on_finish_crossed(id);
            }
            self.population.handle_contact(&contact);
        }
        self.ticks += 1;
        self.population
            .update(&mut self.world, &mut self.rng, dt, &mut self.observer)
    }

    /// Runs as many fixed ticks as fit into the accumulated frame time and
    /// keeps the remainder for the next call.
    pub fn advance(&mut self, elapsed: f32) -> Result<Vec<GenerationSummary>, Error> {
        let mut summaries = Vec::new();
        if self.paused {
            return Ok(summaries);
        }
        let dt = self.settings.physics.tick_seconds;
        self.accumulator += elapsed.max(0.0);
        while self.accumulator >= dt {
            self.accumulator -= dt;
            if let Some(summary) = self.step()? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// Steps until the current generation ends or `max_ticks` pass.
    pub fn run_generation(&mut self, max_ticks: u64) -> Result<Option<GenerationSummary>, Error> {
        for _ in 0..max_ticks {
            if self.paused {
                break;
            }
            if let Some(summary) = self.step()? {
                return Ok(Some(summary));
            }
        }
        Ok(None)
    }

    /// Tears down the population and track, then builds a new world from
    /// `seed`. Tunables and operators carry over.
    pub fn reseed(&mut self, seed: Seed) -> Result<(), Error> {
        info!("reseeding with {seed}");
        self.population.dispose(&mut self.world);
        self.track.destroy(&mut self.world);
        debug!("world emptied: {} bodies left", self.world.body_count());

        self.world = PhysicsWorld::new(&self.settings.physics);
        self.rng = seed.rng();
        self.seed = seed;
        self.track = Track::generate(&self.settings.track, &mut self.world, &mut self.rng);
        self.population
            .set_start_position(start_position(&self.settings, &self.track));
        self.accumulator = 0.0;
        self.ticks = 0;
        self.population
            .generate(&mut self.world, &mut self.rng, &mut self.observer)
    }

    pub fn new_population(&mut self) -> Result<(), Error> {
        self.population
            .generate(&mut self.world, &mut self.rng, &mut self.observer)
    }

    pub fn set_operators(
        &mut self,
        operators: Box<dyn GeneticOperators>,
    ) -> Result<(), OperatorError> {
        self.population.set_operators(operators, &mut self.rng)
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            info!("simulation {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn generation(&self) -> u32 {
        self.population.generation()
    }

    /// Ticks run since the last reseed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn start_position(settings: &Settings, track: &Track) -> [f32; 2] {
    [track.starting_line(), settings.vehicle.spawn_height()]
}
