//! Thin adapter over the rapier2d pipeline.
//!
//! Owns every body, collider and joint of a run. Callers keep the handles
//! it returns and hand them back for removal when the owning vehicle or
//! track goes away.

use std::collections::HashMap;
use std::sync::Mutex;

use rapier2d::na::{point, vector};
use rapier2d::prelude::*;

use crate::config::PhysicsSettings;
use crate::error::PhysicsError;
use crate::vehicle::VehicleId;

pub const TRACK_COLLISION_GROUP: Group = Group::GROUP_1;
pub const VEHICLE_COLLISION_GROUP: Group = Group::GROUP_2;
pub const FINISH_COLLISION_GROUP: Group = Group::GROUP_3;

/// What a collider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartTag {
    Track,
    Finish,
    Chassis(VehicleId),
    Wheel(VehicleId),
}

impl PartTag {
    pub fn vehicle(&self) -> Option<VehicleId> {
        match *self {
            PartTag::Chassis(id) | PartTag::Wheel(id) => Some(id),
            PartTag::Track | PartTag::Finish => None,
        }
    }
}

/// A pair of colliders that started touching during the last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub first: PartTag,
    pub second: PartTag,
}

impl Contact {
    /// The tag paired with one matching `wanted`, if either side matches.
    pub fn other_than(&self, wanted: impl Fn(&PartTag) -> bool) -> Option<(PartTag, PartTag)> {
        if wanted(&self.first) {
            Some((self.first, self.second))
        } else if wanted(&self.second) {
            Some((self.second, self.first))
        } else {
            None
        }
    }
}

#[derive(Default)]
struct StartedCollisions {
    events: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl EventHandler for StartedCollisions {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _) = event {
            if let Ok(mut events) = self.events.lock() {
                events.push((h1, h2));
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collisions: StartedCollisions,
    tags: HashMap<ColliderHandle, PartTag>,
    friction: f32,
    motor_damping: f32,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = settings.tick_seconds;
        integration_parameters.num_solver_iterations = settings.solver_iterations;

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, settings.gravity],
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collisions: StartedCollisions::default(),
            tags: HashMap::new(),
            friction: settings.friction,
            motor_damping: settings.motor_damping,
        }
    }

    pub fn insert_ground_edge(&mut self, a: [f32; 2], b: [f32; 2]) -> RigidBodyHandle {
        let handle = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let collider = ColliderBuilder::segment(point![a[0], a[1]], point![b[0], b[1]])
            .friction(self.friction)
            .collision_groups(InteractionGroups::new(
                TRACK_COLLISION_GROUP,
                VEHICLE_COLLISION_GROUP,
                InteractionTestMode::And,
            ))
            .build();
        self.insert_tagged(collider, handle, PartTag::Track);
        handle
    }

    pub fn insert_finish_sensor(&mut self, a: [f32; 2], b: [f32; 2]) -> RigidBodyHandle {
        let handle = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let collider = ColliderBuilder::segment(point![a[0], a[1]], point![b[0], b[1]])
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .collision_groups(InteractionGroups::new(
                FINISH_COLLISION_GROUP,
                VEHICLE_COLLISION_GROUP,
                InteractionTestMode::And,
            ))
            .build();
        self.insert_tagged(collider, handle, PartTag::Finish);
        handle
    }

    /// Dynamic convex polygon; the hull of `vertices` is used.
    pub fn insert_polygon_body(
        &mut self,
        vertices: &[[f32; 2]],
        density: f32,
        position: [f32; 2],
        tag: PartTag,
    ) -> Result<RigidBodyHandle, PhysicsError> {
        let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v[0], v[1]]).collect();
        let builder = ColliderBuilder::convex_hull(&points).ok_or(PhysicsError::DegenerateChassis)?;
        let handle = self.insert_dynamic_body(position);
        let collider = self.vehicle_collider(builder, density, false);
        self.insert_tagged(collider, handle, tag);
        Ok(handle)
    }

    pub fn insert_circle_body(
        &mut self,
        radius: f32,
        density: f32,
        position: [f32; 2],
        tag: PartTag,
    ) -> RigidBodyHandle {
        let handle = self.insert_dynamic_body(position);
        let shape = ColliderBuilder::ball(radius);
        let collider = self.vehicle_collider(shape, density, true);
        self.insert_tagged(collider, handle, tag);
        handle
    }

    /// Revolute joint with a velocity motor whose torque limit starts at zero.
    ///
    /// `target_speed` is in radians per second, negative for clockwise.
    pub fn insert_wheel_motor(
        &mut self,
        chassis: RigidBodyHandle,
        anchor: [f32; 2],
        wheel: RigidBodyHandle,
        target_speed: f32,
    ) -> ImpulseJointHandle {
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(point![anchor[0], anchor[1]])
            .local_anchor2(point![0.0, 0.0])
            .contacts_enabled(false);
        let handle = self.impulse_joints.insert(chassis, wheel, joint, true);
        if let Some(joint_ref) = self.impulse_joints.get_mut(handle, false) {
            joint_ref
                .data
                .set_motor_model(JointAxis::AngX, MotorModel::ForceBased);
            joint_ref
                .data
                .set_motor_velocity(JointAxis::AngX, target_speed, self.motor_damping);
            joint_ref.data.set_motor_max_force(JointAxis::AngX, 0.0);
        }
        handle
    }

    pub fn set_motor_max_torque(
        &mut self,
        joint: ImpulseJointHandle,
        torque: f32,
    ) -> Result<(), PhysicsError> {
        let joint_ref = self
            .impulse_joints
            .get_mut(joint, true)
            .ok_or(PhysicsError::MissingBody("wheel joint"))?;
        joint_ref.data.set_motor_max_force(JointAxis::AngX, torque);
        Ok(())
    }

    pub fn body_position(&self, body: RigidBodyHandle) -> Option<[f32; 2]> {
        self.bodies.get(body).map(|b| {
            let t = b.translation();
            [t.x, t.y]
        })
    }

    pub fn remove_joint(&mut self, joint: ImpulseJointHandle) {
        self.impulse_joints.remove(joint, true);
    }

    /// Removes a body together with its colliders and attached joints.
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        if let Some(b) = self.bodies.get(body) {
            for collider in b.colliders() {
                self.tags.remove(collider);
            }
        }
        self.bodies.remove(
            body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Advances the world by one fixed step and returns the collider pairs
    /// that began touching.
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &self.collisions,
        );
        self.clear_forces();

        let started = match self.collisions.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        started
            .into_iter()
            .filter_map(|(h1, h2)| {
                let first = *self.tags.get(&h1)?;
                let second = *self.tags.get(&h2)?;
                Some(Contact { first, second })
            })
            .collect()
    }

    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn insert_dynamic_body(&mut self, position: [f32; 2]) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1]])
            .build();
        self.bodies.insert(body)
    }

    fn vehicle_collider(&self, builder: ColliderBuilder, density: f32, report: bool) -> Collider {
        let mut builder = builder
            .density(density)
            .friction(self.friction)
            .collision_groups(InteractionGroups::new(
                VEHICLE_COLLISION_GROUP,
                TRACK_COLLISION_GROUP | FINISH_COLLISION_GROUP,
                InteractionTestMode::And,
            ));
        if report {
            builder = builder.active_events(ActiveEvents::COLLISION_EVENTS);
        }
        builder.build()
    }

    fn insert_tagged(&mut self, collider: Collider, body: RigidBodyHandle, tag: PartTag) {
        let handle = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        self.tags.insert(handle, tag);
    }
}
