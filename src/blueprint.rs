use std::fmt::Write as _;

use crate::config::VehicleSettings;
use crate::error::BlueprintError;

/// One wheel as decoded from a genome. Every value except the attachment
/// index is a fraction of the configured physical range.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelBlueprint {
    /// Index of the chassis vertex the wheel is pinned to.
    pub attachment: usize,
    pub radius: f32,
    pub density: f32,
    pub speed: f32,
    pub torque: f32,
}

/// Decoded, normalized description of a vehicle.
///
/// `body_points[0]` lies at 0° and the rest follow counter-clockwise at even
/// angular spacing; each is a fraction of the body point distance range.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleBlueprint {
    pub body_points: Vec<f32>,
    pub body_density: f32,
    pub wheels: Vec<WheelBlueprint>,
}

impl VehicleBlueprint {
    /// Rejects any fraction outside [0, 1] and any attachment that does not
    /// name a chassis vertex.
    pub fn validate(&self, settings: &VehicleSettings) -> Result<(), BlueprintError> {
        if self.body_points.len() != settings.num_body_points {
            return Err(BlueprintError::WrongLength {
                field: "bodyPoints",
                expected: settings.num_body_points,
                actual: self.body_points.len(),
            });
        }
        if self.wheels.len() != settings.num_wheels {
            return Err(BlueprintError::WrongLength {
                field: "wheels",
                expected: settings.num_wheels,
                actual: self.wheels.len(),
            });
        }
        for (index, &value) in self.body_points.iter().enumerate() {
            check_fraction("bodyPoints", index, value)?;
        }
        if !is_fraction(self.body_density) {
            return Err(BlueprintError::BodyDensityOutOfRange(self.body_density));
        }
        for (index, wheel) in self.wheels.iter().enumerate() {
            if wheel.attachment >= settings.num_body_points {
                return Err(BlueprintError::AttachmentOutOfRange {
                    wheel: index,
                    index: wheel.attachment,
                    num_body_points: settings.num_body_points,
                });
            }
            check_fraction("wheelRadius", index, wheel.radius)?;
            check_fraction("wheelDensity", index, wheel.density)?;
            check_fraction("wheelSpeed", index, wheel.speed)?;
            check_fraction("wheelTorque", index, wheel.torque)?;
        }
        Ok(())
    }

    /// Distance in meters of chassis vertex `i` from the body center.
    pub fn body_point_distance(&self, i: usize, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_body_point_distance,
            settings.max_body_point_distance,
            self.body_points[i],
        )
    }

    /// Angle in degrees of chassis vertex `i`.
    pub fn body_point_angle(&self, i: usize) -> f32 {
        i as f32 * 360.0 / self.body_points.len() as f32
    }

    pub fn body_vertex(&self, i: usize, settings: &VehicleSettings) -> [f32; 2] {
        let distance = self.body_point_distance(i, settings);
        let angle = self.body_point_angle(i).to_radians();
        [distance * angle.cos(), distance * angle.sin()]
    }

    pub fn body_density_value(&self, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_body_density,
            settings.max_body_density,
            self.body_density,
        )
    }

    pub fn wheel_radius(&self, i: usize, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_wheel_radius,
            settings.max_wheel_radius,
            self.wheels[i].radius,
        )
    }

    pub fn wheel_density(&self, i: usize, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_wheel_density,
            settings.max_wheel_density,
            self.wheels[i].density,
        )
    }

    /// Target wheel speed in degrees per second.
    pub fn wheel_speed(&self, i: usize, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_wheel_speed,
            settings.max_wheel_speed,
            self.wheels[i].speed,
        )
    }

    /// Target wheel torque in newton meters.
    pub fn wheel_torque(&self, i: usize, settings: &VehicleSettings) -> f32 {
        lerp(
            settings.min_wheel_torque,
            settings.max_wheel_torque,
            self.wheels[i].torque,
        )
    }

    pub fn describe(&self, settings: &VehicleSettings) -> String {
        let mut out = String::new();
        let points: Vec<String> = self.body_points.iter().map(|p| format!("{p:.2}")).collect();
        let _ = write!(
            out,
            "bodyPoints[{}]={{{}}}",
            points.len(),
            points.join(", ")
        );
        let meters: Vec<String> = (0..self.body_points.len())
            .map(|i| format!("{:.2}", self.body_point_distance(i, settings)))
            .collect();
        let _ = write!(out, " bodyPointsCalcd={{{}}}", meters.join(", "));
        let _ = write!(
            out,
            " bodyDensity={:.2} ({:.1} kg/m2)",
            self.body_density,
            self.body_density_value(settings)
        );
        for (i, wheel) in self.wheels.iter().enumerate() {
            let _ = write!(
                out,
                " wheel[{i}]={{attach={}, radius={:.2}m, density={:.1}, ",
                wheel.attachment,
                self.wheel_radius(i, settings),
                self.wheel_density(i, settings),
            );
            let _ = write!(
                out,
                "speed={:.0}deg/s, torque={:.1}Nm}}",
                self.wheel_speed(i, settings),
                self.wheel_torque(i, settings),
            );
        }
        out
    }
}

fn is_fraction(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

fn check_fraction(field: &'static str, index: usize, value: f32) -> Result<(), BlueprintError> {
    if is_fraction(value) {
        Ok(())
    } else {
        Err(BlueprintError::FractionOutOfRange {
            field,
            index,
            value,
        })
    }
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
