use std::fmt;

use rapier2d::prelude::{ImpulseJointHandle, RigidBodyHandle};
use serde::Serialize;
use tracing::debug;

use crate::blueprint::VehicleBlueprint;
use crate::config::{HealthSettings, Settings, VehicleSettings};
use crate::error::{Error, PhysicsError};
use crate::physics::{PartTag, PhysicsWorld};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleId {
    Slot(usize),
    Champion,
}

impl VehicleId {
    pub fn slot(&self) -> Option<usize> {
        match *self {
            VehicleId::Slot(i) => Some(i),
            VehicleId::Champion => None,
        }
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleId::Slot(i) => write!(f, "{i}"),
            VehicleId::Champion => f.write_str("champion"),
        }
    }
}

/// How a vehicle came to be. Display only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Normal,
    Clone,
    Random,
    Champion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VehicleState {
    /// Built and waiting for a wheel to touch the ground.
    GroundedWaiting,
    /// Motors enabled, torque limits still ramping up.
    Accelerating,
    Cruising,
    Dead,
}

/// Steps each wheel's torque limit from zero to its target in equal
/// increments, one increment per elapsed interval of simulated time.
#[derive(Clone, Debug)]
pub struct TorqueRamp {
    targets: Vec<f32>,
    current: Vec<f32>,
    steps: u32,
    steps_taken: u32,
    interval: f32,
    elapsed: f32,
    active: bool,
}

impl TorqueRamp {
    pub fn new(targets: Vec<f32>, steps: u32, interval: f32) -> Self {
        Self {
            current: vec![0.0; targets.len()],
            targets,
            steps: steps.max(1),
            steps_taken: 0,
            interval,
            elapsed: 0.0,
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
        self.elapsed = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.steps_taken >= self.steps
    }

    pub fn torques(&self) -> &[f32] {
        &self.current
    }

    /// Accumulates `dt`; returns true when the torque limits changed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed += dt;
        let mut changed = false;
        while self.elapsed >= self.interval && !self.is_complete() {
            self.elapsed -= self.interval;
            self.steps_taken += 1;
            for (current, &target) in self.current.iter_mut().zip(&self.targets) {
                *current = if self.steps_taken >= self.steps {
                    target
                } else {
                    target * self.steps_taken as f32 / self.steps as f32
                };
            }
            changed = true;
        }
        if self.is_complete() {
            self.active = false;
        }
        changed
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthUpdate {
    pub health: u32,
    pub max_health: u32,
    pub mean_speed: f32,
    pub changed: bool,
    pub died: bool,
}

impl HealthUpdate {
    pub fn fraction(&self) -> f32 {
        self.health as f32 / self.max_health as f32
    }
}

/// Ring buffer of recent speed samples plus the health counter it drives.
///
/// Health drops by one for every sample whose buffer mean sits below the
/// threshold and snaps back to full as soon as the mean recovers.
#[derive(Clone, Debug)]
pub struct SpeedHistory {
    samples: Vec<f32>,
    next: usize,
    health: u32,
    threshold: f32,
    sample_interval: f32,
    since_sample: f32,
}

impl SpeedHistory {
    pub fn new(settings: &HealthSettings) -> Self {
        let len = settings.history_len().max(1);
        Self {
            samples: vec![0.0; len],
            next: 0,
            health: len as u32,
            threshold: settings.low_speed_threshold,
            sample_interval: settings.sample_interval(),
            since_sample: 0.0,
        }
    }

    pub fn max_health(&self) -> u32 {
        self.samples.len() as u32
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn mean(&self) -> f32 {
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// Feeds one physics tick. Returns an update for the last sample taken
    /// during this tick, if any.
    pub fn record(&mut self, dt: f32, speed: f32) -> Option<HealthUpdate> {
        if self.health == 0 {
            return None;
        }
        self.since_sample += dt;
        let mut update = None;
        while self.since_sample >= self.sample_interval && self.health > 0 {
            self.since_sample -= self.sample_interval;
            update = Some(self.push(speed));
        }
        update
    }

    pub fn push(&mut self, speed: f32) -> HealthUpdate {
        let len = self.samples.len();
        self.samples[self.next] = speed;
        self.next = (self.next + 1) % len;

        let before = self.health;
        let mean = self.mean();
        if mean < self.threshold {
            self.health = self.health.saturating_sub(1);
        } else {
            self.health = self.max_health();
        }
        HealthUpdate {
            health: self.health,
            max_health: self.max_health(),
            mean_speed: mean,
            changed: self.health != before,
            died: before > 0 && self.health == 0,
        }
    }
}

struct VehicleBodies {
    chassis: RigidBodyHandle,
    wheels: Vec<RigidBodyHandle>,
    joints: Vec<ImpulseJointHandle>,
}

pub struct VehicleEntity {
    id: VehicleId,
    kind: EntityType,
    blueprint: VehicleBlueprint,
    bodies: Option<VehicleBodies>,
    state: VehicleState,
    mortal: bool,
    start_position: [f32; 2],
    last_position: [f32; 2],
    speed: f32,
    max_forward_distance: f32,
    history: SpeedHistory,
    ramp: TorqueRamp,
}

impl VehicleEntity {
    /// Validates the blueprint, then creates the chassis, wheels and joints.
    ///
    /// Nothing is added to the world when validation fails.
    pub fn build(
        id: VehicleId,
        kind: EntityType,
        blueprint: VehicleBlueprint,
        start_position: [f32; 2],
        settings: &Settings,
        world: &mut PhysicsWorld,
    ) -> Result<Self, Error> {
        let vehicle = &settings.vehicle;
        blueprint.validate(vehicle)?;
        debug!(
            "building car {id} ({kind:?}): {}",
            blueprint.describe(vehicle)
        );

        let vertices: Vec<[f32; 2]> = (0..vehicle.num_body_points)
            .map(|i| blueprint.body_vertex(i, vehicle))
            .collect();
        let chassis = world.insert_polygon_body(
            &vertices,
            blueprint.body_density_value(vehicle),
            start_position,
            PartTag::Chassis(id),
        )?;

        let mut wheels = Vec::with_capacity(blueprint.wheels.len());
        let mut joints = Vec::with_capacity(blueprint.wheels.len());
        let mut targets = Vec::with_capacity(blueprint.wheels.len());
        for (i, wheel) in blueprint.wheels.iter().enumerate() {
            let anchor = vertices[wheel.attachment];
            let wheel_body = world.insert_circle_body(
                blueprint.wheel_radius(i, vehicle),
                blueprint.wheel_density(i, vehicle),
                [start_position[0] + anchor[0], start_position[1] + anchor[1]],
                PartTag::Wheel(id),
            );
            // Clockwise rotation drives the car toward +x.
            let target_speed = -blueprint.wheel_speed(i, vehicle).to_radians();
            joints.push(world.insert_wheel_motor(chassis, anchor, wheel_body, target_speed));
            wheels.push(wheel_body);
            targets.push(blueprint.wheel_torque(i, vehicle));
        }

        Ok(Self {
            id,
            kind,
            blueprint,
            bodies: Some(VehicleBodies {
                chassis,
                wheels,
                joints,
            }),
            state: VehicleState::GroundedWaiting,
            mortal: kind != EntityType::Champion,
            start_position,
            last_position: start_position,
            speed: 0.0,
            max_forward_distance: 0.0,
            history: SpeedHistory::new(&settings.health),
            ramp: ramp_for(targets, vehicle),
        })
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn kind(&self) -> EntityType {
        self.kind
    }

    pub fn blueprint(&self) -> &VehicleBlueprint {
        &self.blueprint
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state != VehicleState::Dead
    }

    /// Signed speed in m/s from the last step; negative when moving back.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Furthest forward distance from the start line ever reached.
    pub fn max_forward_distance(&self) -> f32 {
        self.max_forward_distance
    }

    pub fn position(&self) -> [f32; 2] {
        self.last_position
    }

    pub fn start_position(&self) -> [f32; 2] {
        self.start_position
    }

    pub fn health(&self) -> u32 {
        self.history.health()
    }

    pub fn health_fraction(&self) -> f32 {
        self.history.health() as f32 / self.history.max_health() as f32
    }

    pub fn wheel_torques(&self) -> &[f32] {
        self.ramp.torques()
    }

    /// Called for every contact involving this vehicle. The first wheel
    /// touching the track enables the motors and starts the torque ramp.
    pub fn on_contact(&mut self, own: PartTag, other: PartTag) {
        if self.state != VehicleState::GroundedWaiting {
            return;
        }
        if matches!(own, PartTag::Wheel(id) if id == self.id) && other == PartTag::Track {
            debug!("car {} touched the track, ramping torque", self.id);
            self.state = VehicleState::Accelerating;
            self.ramp.start();
        }
    }

    pub fn pre_step(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError> {
        if self.state != VehicleState::Accelerating {
            return Ok(());
        }
        if self.ramp.advance(dt) {
            let bodies = self
                .bodies
                .as_ref()
                .ok_or(PhysicsError::MissingBody("chassis"))?;
            for (&joint, &torque) in bodies.joints.iter().zip(self.ramp.torques()) {
                world.set_motor_max_torque(joint, torque)?;
            }
        }
        if self.ramp.is_complete() {
            self.state = VehicleState::Cruising;
        }
        Ok(())
    }

    /// Runs after the physics step: speed, distance and health bookkeeping.
    ///
    /// A car whose health runs out is removed from the world before this
    /// returns.
    pub fn post_step(
        &mut self,
        world: &mut PhysicsWorld,
        dt: f32,
    ) -> Result<Option<HealthUpdate>, PhysicsError> {
        let Some(bodies) = self.bodies.as_ref() else {
            return Ok(None);
        };
        let position = world
            .body_position(bodies.chassis)
            .ok_or(PhysicsError::MissingBody("chassis"))?;
        let update = self.track_motion(position, dt);
        if update.is_some_and(|u| u.died) {
            debug!("car {} died at {:.2} m", self.id, self.max_forward_distance);
            self.destroy(world);
        }
        Ok(update)
    }

    pub(crate) fn track_motion(&mut self, position: [f32; 2], dt: f32) -> Option<HealthUpdate> {
        let dx = position[0] - self.last_position[0];
        let dy = position[1] - self.last_position[1];
        let magnitude = (dx * dx + dy * dy).sqrt() / dt;
        self.speed = if dx < 0.0 { -magnitude } else { magnitude };
        self.last_position = position;
        self.max_forward_distance = self
            .max_forward_distance
            .max(position[0] - self.start_position[0]);

        if !self.mortal {
            return None;
        }
        self.history.record(dt, self.speed)
    }

    /// Removes every body and joint from the world. Safe to call twice.
    pub fn destroy(&mut self, world: &mut PhysicsWorld) {
        if let Some(bodies) = self.bodies.take() {
            for joint in bodies.joints {
                world.remove_joint(joint);
            }
            for wheel in bodies.wheels {
                world.remove_body(wheel);
            }
            world.remove_body(bodies.chassis);
        }
        self.state = VehicleState::Dead;
    }
}

fn ramp_for(targets: Vec<f32>, vehicle: &VehicleSettings) -> TorqueRamp {
    TorqueRamp::new(
        targets,
        vehicle.acceleration_steps(),
        vehicle.acceleration_interval,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::WheelBlueprint;

    fn health(secs: u32, per_sec: u32, threshold: f32) -> HealthSettings {
        HealthSettings {
            speed_history_secs: secs,
            samples_per_sec: per_sec,
            low_speed_threshold: threshold,
        }
    }

    fn blueprint(settings: &VehicleSettings) -> VehicleBlueprint {
        VehicleBlueprint {
            body_points: vec![0.8, 0.0, 0.25, 0.0, 0.8, 0.25, 0.0, 0.25],
            body_density: 0.5,
            wheels: (0..settings.num_wheels)
                .map(|i| WheelBlueprint {
                    attachment: [5, 7][i % 2],
                    radius: 0.5,
                    density: 0.5,
                    speed: 0.5,
                    torque: 0.5,
                })
                .collect(),
        }
    }

    fn flat_world(settings: &Settings) -> PhysicsWorld {
        let mut world = PhysicsWorld::new(&settings.physics);
        world.insert_ground_edge([-50.0, 0.0], [500.0, 0.0]);
        world
    }

    #[test]
    fn ramp_reaches_target_after_all_steps() {
        let mut ramp = TorqueRamp::new(vec![100.0, 50.0], 50, 0.1);
        assert!(!ramp.advance(1.0), "inactive ramp ignores time");
        ramp.start();
        let dt = 1.0 / 60.0;
        let mut ticks = 0;
        while !ramp.is_complete() {
            ramp.advance(dt);
            ticks += 1;
            assert!(ramp.torques()[0] <= 100.0);
            assert!(ticks < 1000);
        }
        assert_eq!(ramp.torques(), &[100.0, 50.0]);
        assert!(!ramp.is_active());
        // 5 s of 1/60 s ticks, allowing for float drift.
        assert!((299..=301).contains(&ticks), "ticks = {ticks}");
    }

    #[test]
    fn ramp_steps_are_even() {
        let mut ramp = TorqueRamp::new(vec![10.0], 10, 0.1);
        ramp.start();
        assert!(ramp.advance(0.1));
        assert!((ramp.torques()[0] - 1.0).abs() < 1e-5);
        assert!(ramp.advance(0.25));
        assert!((ramp.torques()[0] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn health_drains_under_threshold_and_dies_once() {
        let settings = health(2, 4, 1.0);
        let mut history = SpeedHistory::new(&settings);
        assert_eq!(history.max_health(), 8);
        let mut deaths = 0;
        let mut updates = 0;
        for _ in 0..40 {
            if let Some(update) = history.record(0.25, 0.1) {
                updates += 1;
                if update.died {
                    deaths += 1;
                }
            }
        }
        assert_eq!(deaths, 1);
        assert_eq!(updates, 8);
        assert_eq!(history.health(), 0);
    }

    #[test]
    fn health_resets_when_mean_recovers() {
        let settings = health(1, 4, 1.0);
        let mut history = SpeedHistory::new(&settings);
        history.push(0.0);
        history.push(0.0);
        assert_eq!(history.health(), 2);
        // Mean of [8, 0, 0, 0] is 2, above the threshold.
        let update = history.push(8.0);
        assert_eq!(update.health, 4);
        assert!(update.changed);
        assert!(!update.died);
    }

    #[test]
    fn health_samples_on_sub_interval() {
        let settings = health(1, 2, 1.0);
        let mut history = SpeedHistory::new(&settings);
        let dt = 1.0 / 60.0;
        let samples = (0..60)
            .filter(|_| history.record(dt, 0.0).is_some())
            .count();
        assert!((1..=2).contains(&samples), "samples = {samples}");
    }

    #[test]
    fn invalid_blueprint_creates_nothing() {
        let settings = Settings::default();
        let mut world = flat_world(&settings);
        let bodies = world.body_count();
        let mut bad = blueprint(&settings.vehicle);
        bad.body_points[2] = 1.5;
        let result = VehicleEntity::build(
            VehicleId::Slot(0),
            EntityType::Normal,
            bad,
            [0.0, 3.0],
            &settings,
            &mut world,
        );
        assert!(matches!(result, Err(Error::Blueprint(_))));
        assert_eq!(world.body_count(), bodies);
    }

    #[test]
    fn car_grounds_ramps_and_moves_forward() {
        let settings = Settings::default();
        let mut world = flat_world(&settings);
        let start = [0.0, settings.vehicle.spawn_height()];
        let mut car = VehicleEntity::build(
            VehicleId::Slot(0),
            EntityType::Normal,
            blueprint(&settings.vehicle),
            start,
            &settings,
            &mut world,
        )
        .unwrap();
        assert_eq!(world.joint_count(), 2);
        assert_eq!(car.state(), VehicleState::GroundedWaiting);
        assert!(car.wheel_torques().iter().all(|&t| t == 0.0));

        let dt = settings.physics.tick_seconds;
        let mut best = 0.0f32;
        for _ in 0..(60 * 12) {
            car.pre_step(&mut world, dt).unwrap();
            for contact in world.step(dt) {
                if let Some((own, other)) = contact.other_than(|t| t.vehicle() == Some(car.id())) {
                    car.on_contact(own, other);
                }
            }
            car.post_step(&mut world, dt).unwrap();
            assert!(car.max_forward_distance() >= best, "never decreases");
            best = car.max_forward_distance();
        }
        assert_eq!(car.state(), VehicleState::Cruising);
        let moved = car.max_forward_distance();
        assert!(moved > 1.0, "moved {moved}");
        car.destroy(&mut world);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn rolling_back_gives_negative_speed_and_keeps_distance() {
        let settings = Settings::default();
        let mut world = flat_world(&settings);
        let start = [0.0, settings.vehicle.spawn_height()];
        let mut car = VehicleEntity::build(
            VehicleId::Slot(1),
            EntityType::Normal,
            blueprint(&settings.vehicle),
            start,
            &settings,
            &mut world,
        )
        .unwrap();
        let dt = 0.5;

        car.track_motion([start[0] + 2.0, start[1]], dt);
        assert!((car.speed() - 4.0).abs() < 1e-5, "speed = {}", car.speed());
        assert!((car.max_forward_distance() - 2.0).abs() < 1e-5);

        car.track_motion([start[0] + 1.5, start[1]], dt);
        assert!((car.speed() + 1.0).abs() < 1e-5, "speed = {}", car.speed());
        assert!((car.max_forward_distance() - 2.0).abs() < 1e-5);
        assert_eq!(car.position(), [start[0] + 1.5, start[1]]);

        // behind the start line
        car.track_motion([start[0] - 3.0, start[1]], dt);
        assert!(car.speed() < 0.0);
        assert!((car.max_forward_distance() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn stalled_car_dies_and_leaves_world() {
        let mut settings = Settings::default();
        settings.health = health(2, 2, 1000.0);
        let mut world = flat_world(&settings);
        let mut car = VehicleEntity::build(
            VehicleId::Slot(4),
            EntityType::Random,
            blueprint(&settings.vehicle),
            [0.0, settings.vehicle.spawn_height()],
            &settings,
            &mut world,
        )
        .unwrap();

        let dt = settings.physics.tick_seconds;
        let mut deaths = 0;
        let mut ticks = 0;
        while ticks < 60 * 10 {
            ticks += 1;
            car.pre_step(&mut world, dt).unwrap();
            world.step(dt);
            if let Some(update) = car.post_step(&mut world, dt).unwrap() {
                if update.died {
                    deaths += 1;
                }
            }
        }
        assert_eq!(deaths, 1);
        assert!(!car.is_alive());
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn champion_never_dies() {
        let mut settings = Settings::default();
        settings.health = health(1, 2, 1000.0);
        let mut world = flat_world(&settings);
        let mut ghost = VehicleEntity::build(
            VehicleId::Champion,
            EntityType::Champion,
            blueprint(&settings.vehicle),
            [0.0, settings.vehicle.spawn_height()],
            &settings,
            &mut world,
        )
        .unwrap();
        let dt = settings.physics.tick_seconds;
        for _ in 0..(60 * 5) {
            world.step(dt);
            assert_eq!(ghost.post_step(&mut world, dt).unwrap(), None);
        }
        assert!(ghost.is_alive());
    }
}
