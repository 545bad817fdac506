use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "GENETIC_CARS_CONFIG";
pub const ENV_SEED: &str = "GENETIC_CARS_SEED";
pub const ENV_GENERATIONS: &str = "GENETIC_CARS_GENERATIONS";
pub const ENV_MAX_TICKS: &str = "GENETIC_CARS_MAX_TICKS";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub vehicle: VehicleSettings,
    pub health: HealthSettings,
    pub population: PopulationSettings,
    pub track: TrackSettings,
    pub physics: PhysicsSettings,
}

/// Vehicle shape and the physical ranges every blueprint fraction maps into.
///
/// Lengths are meters, densities kg/m², torque N·m and wheel speed deg/s.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleSettings {
    pub num_body_points: usize,
    pub num_wheels: usize,
    pub min_body_point_distance: f32,
    pub max_body_point_distance: f32,
    pub min_body_density: f32,
    pub max_body_density: f32,
    pub min_wheel_radius: f32,
    pub max_wheel_radius: f32,
    pub min_wheel_density: f32,
    pub max_wheel_density: f32,
    pub min_wheel_speed: f32,
    pub max_wheel_speed: f32,
    pub min_wheel_torque: f32,
    pub max_wheel_torque: f32,
    /// Seconds over which wheel torque ramps from zero to its target.
    pub acceleration_time: f32,
    /// Seconds between torque ramp steps.
    pub acceleration_interval: f32,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            num_body_points: 8,
            num_wheels: 2,
            min_body_point_distance: 0.2,
            max_body_point_distance: 1.2,
            min_body_density: 25.0,
            max_body_density: 250.0,
            min_wheel_radius: 0.2,
            max_wheel_radius: 0.6,
            min_wheel_density: 20.0,
            max_wheel_density: 150.0,
            min_wheel_speed: 90.0,
            max_wheel_speed: 900.0,
            min_wheel_torque: 20.0,
            max_wheel_torque: 300.0,
            acceleration_time: 5.0,
            acceleration_interval: 0.1,
        }
    }
}

impl VehicleSettings {
    pub fn acceleration_steps(&self) -> u32 {
        (self.acceleration_time / self.acceleration_interval)
            .round()
            .max(1.0) as u32
    }

    pub fn spawn_height(&self) -> f32 {
        2.0 * self.max_body_point_distance + self.max_wheel_radius
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthSettings {
    pub speed_history_secs: u32,
    pub samples_per_sec: u32,
    /// Mean speed (m/s) under which a car loses health.
    pub low_speed_threshold: f32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            speed_history_secs: 10,
            samples_per_sec: 2,
            low_speed_threshold: 0.4,
        }
    }
}

impl HealthSettings {
    pub fn history_len(&self) -> usize {
        (self.speed_history_secs * self.samples_per_sec) as usize
    }

    pub fn sample_interval(&self) -> f32 {
        1.0 / self.samples_per_sec as f32
    }

    /// Seconds of sustained low average speed before a car dies.
    pub fn seconds_til_death(&self) -> f32 {
        self.history_len() as f32 * self.sample_interval()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PopulationSettings {
    pub size: usize,
    pub num_clones: usize,
    pub num_random: usize,
    pub mutation_rate: f32,
    pub breeding_pop_percent: f32,
    /// Minimum distance (m) a generation's best must beat the champion by.
    pub champion_threshold: f32,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            size: 20,
            num_clones: 2,
            num_random: 2,
            mutation_rate: 0.1,
            breeding_pop_percent: 0.5,
            champion_threshold: 0.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackSettings {
    pub num_pieces: usize,
    pub piece_length: f32,
    /// Degrees.
    pub min_piece_angle: f32,
    /// Degrees.
    pub max_piece_angle: f32,
    pub sign_keep_probability: f32,
    pub start_pad_length: f32,
    /// Distance from the end of the start pad back to the starting line.
    pub start_overhang: f32,
    pub landing_pad_length: f32,
    pub end_stop_height: f32,
    /// How far into the last generated piece the finish line sits, in [0, 1].
    pub finish_fraction: f32,
    pub finish_height: f32,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            num_pieces: 100,
            piece_length: 1.0,
            min_piece_angle: 5.0,
            max_piece_angle: 75.0,
            sign_keep_probability: 0.4,
            start_pad_length: 10.0,
            start_overhang: 5.0,
            landing_pad_length: 10.0,
            end_stop_height: 10.0,
            finish_fraction: 0.5,
            finish_height: 10.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsSettings {
    pub tick_seconds: f32,
    pub gravity: f32,
    pub solver_iterations: usize,
    pub friction: f32,
    /// Gain of the wheel velocity motors; the torque limit caps the result.
    pub motor_damping: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 60.0,
            gravity: -9.8,
            solver_iterations: 10,
            friction: 1.0,
            motor_damping: 1.0e4,
        }
    }
}

impl Settings {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.vehicle;
        if v.num_body_points < 3 {
            return Err(invalid("vehicle.numBodyPoints", "needs at least 3 points"));
        }
        if v.num_body_points > 256 {
            return Err(invalid(
                "vehicle.numBodyPoints",
                "an 8-bit attachment gene addresses at most 256 points",
            ));
        }
        if v.num_wheels == 0 {
            return Err(invalid("vehicle.numWheels", "needs at least one wheel"));
        }
        for (name, min, max) in [
            (
                "vehicle.bodyPointDistance",
                v.min_body_point_distance,
                v.max_body_point_distance,
            ),
            (
                "vehicle.bodyDensity",
                v.min_body_density,
                v.max_body_density,
            ),
            (
                "vehicle.wheelRadius",
                v.min_wheel_radius,
                v.max_wheel_radius,
            ),
            (
                "vehicle.wheelDensity",
                v.min_wheel_density,
                v.max_wheel_density,
            ),
            ("vehicle.wheelSpeed", v.min_wheel_speed, v.max_wheel_speed),
            ("vehicle.wheelTorque", v.min_wheel_torque, v.max_wheel_torque),
        ] {
            check_range(name, min, max)?;
        }
        if v.min_body_point_distance <= 0.0 || v.min_wheel_radius <= 0.0 {
            return Err(invalid("vehicle", "lengths must be positive"));
        }
        if v.min_body_density <= 0.0 || v.min_wheel_density <= 0.0 {
            return Err(invalid("vehicle", "densities must be positive"));
        }
        if v.acceleration_interval <= 0.0 || v.acceleration_time < v.acceleration_interval {
            return Err(invalid(
                "vehicle.accelerationTime",
                "must be at least one positive acceleration interval",
            ));
        }

        let h = &self.health;
        if h.speed_history_secs == 0 || h.samples_per_sec == 0 {
            return Err(invalid("health", "speed history needs at least one sample"));
        }

        let p = &self.population;
        if p.size == 0 {
            return Err(invalid("population.size", "must be positive"));
        }
        if p.num_clones + p.num_random > p.size {
            return Err(invalid(
                "population.numClones",
                format!(
                    "numClones ({}) + numRandom ({}) exceeds size ({})",
                    p.num_clones, p.num_random, p.size
                ),
            ));
        }
        if !(0.0..=1.0).contains(&p.mutation_rate) {
            return Err(invalid("population.mutationRate", "must be within [0, 1]"));
        }
        if !(p.breeding_pop_percent > 0.0 && p.breeding_pop_percent <= 1.0) {
            return Err(invalid("population.breedingPopPercent", "must be within (0, 1]"));
        }
        if p.champion_threshold < 0.0 {
            return Err(invalid("population.championThreshold", "must not be negative"));
        }

        let t = &self.track;
        if t.num_pieces == 0 || t.piece_length <= 0.0 {
            return Err(invalid("track.numPieces", "track needs at least one positive piece"));
        }
        check_range("track.pieceAngle", t.min_piece_angle, t.max_piece_angle)?;
        if !(0.0..=1.0).contains(&t.sign_keep_probability) {
            return Err(invalid("track.signKeepProbability", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&t.finish_fraction) {
            return Err(invalid("track.finishFraction", "must be within [0, 1]"));
        }
        if t.start_pad_length <= 0.0
            || t.start_overhang <= 0.0
            || t.start_overhang > t.start_pad_length
        {
            return Err(invalid(
                "track.startOverhang",
                "must be positive and fit on the start pad",
            ));
        }

        if self.physics.tick_seconds <= 0.0 {
            return Err(invalid("physics.tickSeconds", "must be positive"));
        }
        if self.physics.solver_iterations == 0 {
            return Err(invalid("physics.solverIterations", "must be positive"));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("loaded settings:");
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(sections)) => {
                for (section, values) in sections {
                    info!("{section}={values}");
                }
            }
            Ok(other) => info!("{other}"),
            Err(err) => info!("settings not printable: {err}"),
        }
    }
}

fn check_range(name: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(invalid(name, format!("min {min} must not exceed max {max}")));
    }
    Ok(())
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

/// Positive integer from the environment; anything else is logged and
/// ignored.
pub fn resolve_env_u64(name: &str) -> Option<u64> {
    let raw_value = std::env::var(name).ok()?;
    match raw_value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Some(parsed),
        _ => {
            warn!("{name} must be a positive integer; got '{raw_value}'");
            None
        }
    }
}
