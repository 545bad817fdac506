//! Procedural terrain: a flat start pad, a chain of pieces that get steeper
//! as the track goes on, a landing pad and an end stop. The finish line is a
//! sensor partway into the last piece.

use rand::{Rng, RngCore};
use rapier2d::prelude::RigidBodyHandle;
use tracing::{debug, info};

use crate::blueprint::lerp;
use crate::config::TrackSettings;
use crate::physics::{Contact, PartTag, PhysicsWorld};
use crate::vehicle::VehicleId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: [f32; 2],
    pub end: [f32; 2],
}

impl Segment {
    fn point_at(&self, t: f32) -> [f32; 2] {
        [
            lerp(self.start[0], self.end[0], t),
            lerp(self.start[1], self.end[1], t),
        ]
    }
}

/// Angle range in degrees allowed for piece `index`.
///
/// Progress is mapped onto x in (2, 10] and pushed through two power
/// curves, so both bounds grow along the track and `min <= max` holds.
pub fn piece_angle_bounds(index: usize, settings: &TrackSettings) -> (f32, f32) {
    let x = ((index + 1) as f32 / settings.num_pieces as f32) * 8.0 + 2.0;
    let span = settings.max_piece_angle - settings.min_piece_angle;
    let max = (x.powf(3.5) / 1000.0).clamp(0.0, 1.0) * span + settings.min_piece_angle;
    let min = ((x.powf(3.1) - x.powf(2.5)) / 1000.0).clamp(0.0, 1.0) * span
        + settings.min_piece_angle;
    (min, max)
}

pub struct Track {
    segments: Vec<Segment>,
    piece_angles: Vec<f32>,
    finish_line: Segment,
    starting_line: f32,
    bodies: Vec<RigidBodyHandle>,
    lower: [f32; 2],
    upper: [f32; 2],
    winner: Option<VehicleId>,
}

impl Track {
    /// Builds the whole track into `world`. Deterministic for a given RNG
    /// state.
    pub fn generate(
        settings: &TrackSettings,
        world: &mut PhysicsWorld,
        rng: &mut dyn RngCore,
    ) -> Self {
        let mut segments = Vec::with_capacity(settings.num_pieces + 3);
        let mut piece_angles = Vec::with_capacity(settings.num_pieces);

        let origin = [0.0, 0.0];
        segments.push(Segment {
            start: [origin[0] - settings.start_pad_length, origin[1]],
            end: origin,
        });

        let mut cursor = origin;
        let mut previous_sign = 1.0f32;
        for i in 0..settings.num_pieces {
            let (min, max) = piece_angle_bounds(i, settings);
            let magnitude = lerp(min, max, rng.random::<f32>());
            let sign = if rng.random::<f32>() < settings.sign_keep_probability {
                previous_sign
            } else {
                -previous_sign
            };
            previous_sign = sign;
            let angle = magnitude * sign;
            let radians = angle.to_radians();
            let end = [
                cursor[0] + settings.piece_length * radians.cos(),
                cursor[1] + settings.piece_length * radians.sin(),
            ];
            segments.push(Segment { start: cursor, end });
            piece_angles.push(angle);
            cursor = end;
        }

        let last_piece = segments[segments.len() - 1];
        let landing_end = [cursor[0] + settings.landing_pad_length, cursor[1]];
        segments.push(Segment {
            start: cursor,
            end: landing_end,
        });
        segments.push(Segment {
            start: landing_end,
            end: [landing_end[0], landing_end[1] + settings.end_stop_height],
        });

        let mut bodies: Vec<RigidBodyHandle> = segments
            .iter()
            .map(|s| world.insert_ground_edge(s.start, s.end))
            .collect();

        let base = last_piece.point_at(settings.finish_fraction);
        let finish_line = Segment {
            start: base,
            end: [base[0], base[1] + settings.finish_height],
        };
        bodies.push(world.insert_finish_sensor(finish_line.start, finish_line.end));

        let mut lower = [f32::INFINITY; 2];
        let mut upper = [f32::NEG_INFINITY; 2];
        for point in segments.iter().flat_map(|s| [s.start, s.end]) {
            for axis in 0..2 {
                lower[axis] = lower[axis].min(point[axis]);
                upper[axis] = upper[axis].max(point[axis]);
            }
        }

        let track = Self {
            segments,
            piece_angles,
            finish_line,
            starting_line: origin[0] - settings.start_overhang,
            bodies,
            lower,
            upper,
            winner: None,
        };
        debug!(
            "track generated: {} pieces, {:.1} x {:.1} m, finish at x = {:.1}",
            settings.num_pieces,
            track.dimensions()[0],
            track.dimensions()[1],
            finish_line.start[0]
        );
        track
    }

    /// X coordinate where vehicles are placed.
    pub fn starting_line(&self) -> f32 {
        self.starting_line
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Signed angle in degrees of each generated piece.
    pub fn piece_angles(&self) -> &[f32] {
        &self.piece_angles
    }

    pub fn finish_line(&self) -> Segment {
        self.finish_line
    }

    pub fn dimensions(&self) -> [f32; 2] {
        [self.upper[0] - self.lower[0], self.upper[1] - self.lower[1]]
    }

    pub fn center(&self) -> [f32; 2] {
        [
            (self.upper[0] + self.lower[0]) / 2.0,
            (self.upper[1] + self.lower[1]) / 2.0,
        ]
    }

    pub fn winner(&self) -> Option<VehicleId> {
        self.winner
    }

    /// Records a finish when `contact` is a population chassis touching the
    /// finish sensor. Only the first such contact counts.
    pub fn handle_contact(&mut self, contact: &Contact) -> Option<VehicleId> {
        if self.winner.is_some() {
            return None;
        }
        let (_, other) = contact.other_than(|tag| *tag == PartTag::Finish)?;
        let PartTag::Chassis(id) = other else {
            return None;
        };
        if id == VehicleId::Champion {
            return None;
        }
        info!("car {id} crossed the finish line");
        self.winner = Some(id);
        Some(id)
    }

    pub fn destroy(&mut self, world: &mut PhysicsWorld) {
        for body in self.bodies.drain(..) {
            world.remove_body(body);
        }
    }
}
