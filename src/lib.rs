//! Evolves 2D wheeled vehicles. Each genome decodes to a chassis polygon
//! and a set of motorized wheels; fitness is how far the car drives along a
//! procedural track before it stalls.

pub mod blueprint;
pub mod config;
pub mod error;
pub mod events;
pub mod genome;
pub mod operators;
pub mod physics;
pub mod population;
pub mod seed;
pub mod simulation;
pub mod track;
pub mod vehicle;

pub use blueprint::{VehicleBlueprint, WheelBlueprint};
pub use config::Settings;
pub use error::{Error, Result};
pub use events::{EventLog, SimulationEvent, SimulationObserver};
pub use genome::{Genome, GenomeLayout};
pub use operators::{DefaultOperators, GeneticOperators};
pub use population::{ChampionRecord, GenerationSummary, Population};
pub use seed::Seed;
pub use simulation::Simulation;
pub use track::Track;
pub use vehicle::{EntityType, VehicleEntity, VehicleId};
