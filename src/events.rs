use serde::Serialize;

use crate::vehicle::{EntityType, VehicleId};

/// A rebuilt car as announced with a new generation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSnapshot {
    pub id: VehicleId,
    pub kind: EntityType,
    pub genome: String,
}

/// Synchronous notifications raised by the simulation. Every method has a
/// no-op default, so listeners only implement what they need.
pub trait SimulationObserver {
    fn on_new_generation(&mut self, _generation: u32, _cars: &[CarSnapshot]) {}

    fn on_new_champion(&mut self, _generation: u32, _id: VehicleId, _distance: f32) {}

    /// `fraction` is health over maximum health, in [0, 1].
    fn on_health_changed(&mut self, _id: VehicleId, _fraction: f32) {}

    fn on_finish_crossed(&mut self, _id: VehicleId) {}

    fn on_vehicle_died(&mut self, _id: VehicleId, _distance: f32) {}
}

/// Listener that ignores everything.
impl SimulationObserver for () {}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    NewGeneration {
        generation: u32,
        cars: Vec<CarSnapshot>,
    },
    NewChampion {
        generation: u32,
        id: VehicleId,
        distance: f32,
    },
    HealthChanged { id: VehicleId, fraction: f32 },
    FinishCrossed { id: VehicleId },
    VehicleDied { id: VehicleId, distance: f32 },
}

/// Observer that keeps every notification in arrival order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
    record_health: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep health changes, which arrive every sample for every car.
    pub fn with_health(mut self) -> Self {
        self.record_health = true;
        self
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn generations(&self) -> impl Iterator<Item = (u32, &[CarSnapshot])> {
        self.events.iter().filter_map(|event| match event {
            SimulationEvent::NewGeneration { generation, cars } => {
                Some((*generation, cars.as_slice()))
            }
            _ => None,
        })
    }

    pub fn champions(&self) -> impl Iterator<Item = (u32, VehicleId, f32)> + '_ {
        self.events.iter().filter_map(|event| match *event {
            SimulationEvent::NewChampion {
                generation,
                id,
                distance,
            } => Some((generation, id, distance)),
            _ => None,
        })
    }

    pub fn deaths(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, SimulationEvent::VehicleDied { .. }))
            .count()
    }
}

impl SimulationObserver for EventLog {
    fn on_new_generation(&mut self, generation: u32, cars: &[CarSnapshot]) {
        self.events.push(SimulationEvent::NewGeneration {
            generation,
            cars: cars.to_vec(),
        });
    }

    fn on_new_champion(&mut self, generation: u32, id: VehicleId, distance: f32) {
        self.events.push(SimulationEvent::NewChampion {
            generation,
            id,
            distance,
        });
    }

    fn on_health_changed(&mut self, id: VehicleId, fraction: f32) {
        if self.record_health {
            self.events.push(SimulationEvent::HealthChanged { id, fraction });
        }
    }

    fn on_finish_crossed(&mut self, id: VehicleId) {
        self.events.push(SimulationEvent::FinishCrossed { id });
    }

    fn on_vehicle_died(&mut self, id: VehicleId, distance: f32) {
        self.events.push(SimulationEvent::VehicleDied { id, distance });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_order_and_skips_health_by_default() {
        let mut log = EventLog::new();
        log.on_health_changed(VehicleId::Slot(0), 0.5);
        log.on_vehicle_died(VehicleId::Slot(0), 3.0);
        log.on_new_champion(1, VehicleId::Slot(0), 3.0);
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.deaths(), 1);
        assert_eq!(
            log.champions().collect::<Vec<_>>(),
            vec![(1, VehicleId::Slot(0), 3.0)]
        );
    }

    #[test]
    fn health_recorded_when_asked() {
        let mut log = EventLog::new().with_health();
        log.on_health_changed(VehicleId::Slot(2), 0.25);
        assert_eq!(
            log.take(),
            vec![SimulationEvent::HealthChanged {
                id: VehicleId::Slot(2),
                fraction: 0.25,
            }]
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = SimulationEvent::FinishCrossed {
            id: VehicleId::Slot(3),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"finish_crossed","id":{"slot":3}}"#);
    }
}
