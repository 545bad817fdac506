//! Generational scheduler: evaluates a cohort until every car is dead, then
//! breeds the next one from the best performers.

use rand::{Rng, RngCore};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{Error, OperatorError, PhysicsError, TunableError};
use crate::events::{CarSnapshot, SimulationObserver};
use crate::genome::{Genome, GenomeLayout};
use crate::operators::{DefaultOperators, GeneticOperators, check_operators};
use crate::physics::{Contact, PhysicsWorld};
use crate::vehicle::{EntityType, VehicleEntity, VehicleId};

pub struct Car {
    genome: Genome,
    entity: VehicleEntity,
}

impl Car {
    pub fn id(&self) -> VehicleId {
        self.entity.id()
    }

    pub fn kind(&self) -> EntityType {
        self.entity.kind()
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn entity(&self) -> &VehicleEntity {
        &self.entity
    }

    pub fn distance(&self) -> f32 {
        self.entity.max_forward_distance()
    }

    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    fn snapshot(&self) -> CarSnapshot {
        CarSnapshot {
            id: self.id(),
            kind: self.kind(),
            genome: self.genome.to_string(),
        }
    }
}

struct Champion {
    genome: Genome,
    distance: f32,
    entity: VehicleEntity,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionRecord {
    pub generation: u32,
    /// Slot the winning car held in its generation.
    pub id: VehicleId,
    pub distance: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub generation: u32,
    pub best: f32,
    pub best_id: VehicleId,
    pub mean: f32,
    pub champion: Option<f32>,
}

pub struct Population {
    settings: Settings,
    layout: GenomeLayout,
    operators: Box<dyn GeneticOperators>,
    cars: Vec<Car>,
    champion: Option<Champion>,
    champion_history: Vec<ChampionRecord>,
    generation: u32,
    start_position: [f32; 2],
    leader: Option<VehicleId>,
}

impl Population {
    /// Empty population that places its cars at `start_position`. Call
    /// [`Population::generate`] to fill it.
    pub fn new(settings: &Settings, start_position: [f32; 2]) -> Self {
        Self {
            settings: settings.clone(),
            layout: GenomeLayout::from_settings(&settings.vehicle),
            operators: Box::new(DefaultOperators),
            cars: Vec::with_capacity(settings.population.size),
            champion: None,
            champion_history: Vec::new(),
            generation: 0,
            start_position,
            leader: None,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Slot `id`. Ids match slot positions, reassigned every generation.
    pub fn get_car(&self, id: usize) -> Option<&Car> {
        self.cars.get(id)
    }

    pub fn live_count(&self) -> usize {
        self.cars.iter().filter(|car| car.is_alive()).count()
    }

    /// Furthest living car as of the last update.
    pub fn leader(&self) -> Option<VehicleId> {
        self.leader
    }

    pub fn champion_genome(&self) -> Option<&Genome> {
        self.champion.as_ref().map(|c| &c.genome)
    }

    pub fn champion_entity(&self) -> Option<&VehicleEntity> {
        self.champion.as_ref().map(|c| &c.entity)
    }

    pub fn champion_distance(&self) -> f32 {
        self.champion.as_ref().map_or(0.0, |c| c.distance)
    }

    pub fn champion_history(&self) -> &[ChampionRecord] {
        &self.champion_history
    }

    /// Used for cars built from the next generation on.
    pub fn set_start_position(&mut self, start_position: [f32; 2]) {
        self.start_position = start_position;
    }

    pub fn layout(&self) -> GenomeLayout {
        self.layout
    }

    pub fn num_clones(&self) -> usize {
        self.settings.population.num_clones
    }

    pub fn num_random(&self) -> usize {
        self.settings.population.num_random
    }

    pub fn mutation_rate(&self) -> f32 {
        self.settings.population.mutation_rate
    }

    pub fn operators_name(&self) -> &str {
        self.operators.name()
    }

    /// Takes effect at the next generation.
    pub fn set_num_clones(&mut self, value: usize) -> Result<(), TunableError> {
        let p = &mut self.settings.population;
        let available = p.size.saturating_sub(p.num_random);
        if value > available {
            let err = TunableError::NumClones {
                value,
                num_random: p.num_random,
                available,
            };
            warn!("{err}");
            return Err(err);
        }
        p.num_clones = value;
        Ok(())
    }

    pub fn set_num_random(&mut self, value: usize) -> Result<(), TunableError> {
        let p = &mut self.settings.population;
        let available = p.size.saturating_sub(p.num_clones);
        if value > available {
            let err = TunableError::NumRandom {
                value,
                num_clones: p.num_clones,
                available,
            };
            warn!("{err}");
            return Err(err);
        }
        p.num_random = value;
        Ok(())
    }

    pub fn set_mutation_rate(&mut self, value: f32) -> Result<(), TunableError> {
        if !(0.0..=1.0).contains(&value) {
            let err = TunableError::MutationRate(value);
            warn!("{err}");
            return Err(err);
        }
        self.settings.population.mutation_rate = value;
        Ok(())
    }

    /// Swaps in a new operator pair after checking it once on random
    /// genomes. A pair that breaks the contract is rejected and the current
    /// one stays.
    pub fn set_operators(
        &mut self,
        operators: Box<dyn GeneticOperators>,
        rng: &mut dyn RngCore,
    ) -> Result<(), OperatorError> {
        if let Err(err) = check_operators(operators.as_ref(), self.layout, rng) {
            warn!("rejected operators {:?}: {err}", operators.name());
            return Err(err);
        }
        info!("genetic operators set to {:?}", operators.name());
        self.operators = operators;
        Ok(())
    }

    /// Full reset: every slot gets a random genome, the champion and its
    /// history are cleared and the generation counter restarts at one.
    pub fn generate(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut dyn RngCore,
        observer: &mut dyn SimulationObserver,
    ) -> Result<(), Error> {
        self.dispose(world);
        self.champion_history.clear();
        let genomes = (0..self.settings.population.size)
            .map(|_| (Genome::random(self.layout, rng), EntityType::Random))
            .collect();
        self.rebuild(genomes, world)?;
        self.generation = 1;
        info!("generated a fresh population of {}", self.cars.len());
        self.announce_generation(observer);
        Ok(())
    }

    pub fn dispose(&mut self, world: &mut PhysicsWorld) {
        for mut car in self.cars.drain(..) {
            car.entity.destroy(world);
        }
        if let Some(mut champion) = self.champion.take() {
            champion.entity.destroy(world);
        }
        self.leader = None;
    }

    pub fn pre_step(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError> {
        for car in self.cars.iter_mut().filter(|car| car.is_alive()) {
            car.entity.pre_step(world, dt)?;
        }
        if let Some(champion) = self.champion.as_mut() {
            champion.entity.pre_step(world, dt)?;
        }
        Ok(())
    }

    pub fn handle_contact(&mut self, contact: &Contact) {
        let Some((own, other)) = contact.other_than(|tag| tag.vehicle().is_some()) else {
            return;
        };
        let entity = match own.vehicle() {
            Some(VehicleId::Slot(i)) => self.cars.get_mut(i).map(|car| &mut car.entity),
            Some(VehicleId::Champion) => self.champion.as_mut().map(|c| &mut c.entity),
            None => None,
        };
        if let Some(entity) = entity {
            entity.on_contact(own, other);
        }
    }

    /// Per-tick bookkeeping after the physics step. Returns the summary of
    /// the finished generation when the last car died during this tick.
    pub fn update(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut dyn RngCore,
        dt: f32,
        observer: &mut dyn SimulationObserver,
    ) -> Result<Option<GenerationSummary>, Error> {
        for car in self.cars.iter_mut().filter(|car| car.is_alive()) {
            let Some(update) = car.entity.post_step(world, dt)? else {
                continue;
            };
            if update.changed {
                observer.on_health_changed(car.id(), update.fraction());
            }
            if update.died {
                observer.on_vehicle_died(car.id(), car.distance());
            }
        }
        if let Some(champion) = self.champion.as_mut() {
            champion.entity.post_step(world, dt)?;
        }

        if !self.cars.is_empty() && self.live_count() == 0 {
            return self.next_generation(world, rng, observer).map(Some);
        }
        self.refresh_leader();
        Ok(None)
    }

    /// Ties go to the lowest slot.
    fn refresh_leader(&mut self) {
        self.leader = self
            .cars
            .iter()
            .filter(|car| car.is_alive())
            .fold(None::<&Car>, |best, car| match best {
                Some(b) if b.distance() >= car.distance() => Some(b),
                _ => Some(car),
            })
            .map(Car::id);
    }

    /// Ranks the finished generation, updates the champion and rebuilds
    /// every slot from clones, bred children and random newcomers.
    ///
    /// All child genomes are produced before anything is torn down, so an
    /// operator failure leaves the current generation in place.
    pub fn next_generation(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut dyn RngCore,
        observer: &mut dyn SimulationObserver,
    ) -> Result<GenerationSummary, Error> {
        let mut ranked: Vec<usize> = (0..self.cars.len()).collect();
        ranked.sort_by(|&a, &b| self.cars[b].distance().total_cmp(&self.cars[a].distance()));
        let Some(&best_slot) = ranked.first() else {
            return Err(Error::EmptyPopulation);
        };

        let genomes = self.breed(&ranked, rng)?;

        let best = &self.cars[best_slot];
        let total: f32 = self.cars.iter().map(Car::distance).sum();
        let summary = GenerationSummary {
            generation: self.generation,
            best: best.distance(),
            best_id: best.id(),
            mean: total / self.cars.len() as f32,
            champion: None,
        };

        let threshold = self.settings.population.champion_threshold;
        let previous = self.champion.as_ref().map(|c| c.distance);
        if should_replace_champion(summary.best, previous, threshold) {
            let genome = best.genome.clone();
            if let Some(mut old) = self.champion.take() {
                old.entity.destroy(world);
            }
            let entity = self.build_entity(
                VehicleId::Champion,
                EntityType::Champion,
                &genome,
                world,
            )?;
            self.champion = Some(Champion {
                genome,
                distance: summary.best,
                entity,
            });
            self.champion_history.push(ChampionRecord {
                generation: self.generation,
                id: summary.best_id,
                distance: summary.best,
            });
            info!(
                "new champion in generation {}: car {} at {:.2} m",
                self.generation, summary.best_id, summary.best
            );
            observer.on_new_champion(self.generation, summary.best_id, summary.best);
        } else if let Some(mut champion) = self.champion.take() {
            champion.entity.destroy(world);
            champion.entity = self.build_entity(
                VehicleId::Champion,
                EntityType::Champion,
                &champion.genome,
                world,
            )?;
            self.champion = Some(champion);
        }

        self.rebuild(genomes, world)?;
        self.generation += 1;
        let summary = GenerationSummary {
            champion: self.champion.as_ref().map(|c| c.distance),
            ..summary
        };
        info!(
            "generation {} done: best {:.2} m (car {}), mean {:.2} m",
            summary.generation, summary.best, summary.best_id, summary.mean
        );
        self.announce_generation(observer);
        Ok(summary)
    }

    fn breed(
        &self,
        ranked: &[usize],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<(Genome, EntityType)>, OperatorError> {
        let p = &self.settings.population;
        let pool: Vec<&Genome> = ranked
            .iter()
            .take(breeding_pool_size(p.size, p.breeding_pop_percent))
            .map(|&slot| &self.cars[slot].genome)
            .collect();
        debug!(
            "breeding pool of {} for generation {}",
            pool.len(),
            self.generation + 1
        );

        let operators = self.operators.as_ref();
        let abort = |err: &OperatorError| error!("aborting generation {}: {err}", self.generation);
        let mut genomes = Vec::with_capacity(p.size);
        for i in 0..p.size {
            if i < p.num_clones {
                genomes.push((self.cars[ranked[i]].genome.clone(), EntityType::Clone));
            } else if i < p.size - p.num_random {
                let (a, b) = pick_parents(pool.len(), rng);
                let mut child =
                    Genome::crossover(pool[a], pool[b], operators, rng).inspect_err(abort)?;
                if rng.random::<f32>() < p.mutation_rate {
                    child = child.mutated(operators, rng).inspect_err(abort)?;
                }
                genomes.push((child, EntityType::Normal));
            } else {
                genomes.push((Genome::random(self.layout, rng), EntityType::Random));
            }
        }
        Ok(genomes)
    }

    fn rebuild(
        &mut self,
        genomes: Vec<(Genome, EntityType)>,
        world: &mut PhysicsWorld,
    ) -> Result<(), Error> {
        for mut car in self.cars.drain(..) {
            car.entity.destroy(world);
        }
        for (slot, (genome, kind)) in genomes.into_iter().enumerate() {
            let entity = self.build_entity(VehicleId::Slot(slot), kind, &genome, world)?;
            self.cars.push(Car { genome, entity });
        }
        self.leader = None;
        Ok(())
    }

    fn build_entity(
        &self,
        id: VehicleId,
        kind: EntityType,
        genome: &Genome,
        world: &mut PhysicsWorld,
    ) -> Result<VehicleEntity, Error> {
        VehicleEntity::build(
            id,
            kind,
            genome.decode(),
            self.start_position,
            &self.settings,
            world,
        )
    }

    fn announce_generation(&self, observer: &mut dyn SimulationObserver) {
        let cars: Vec<CarSnapshot> = self.cars.iter().map(Car::snapshot).collect();
        observer.on_new_generation(self.generation, &cars);
    }
}

/// Number of top genomes eligible as parents; at least two when the
/// population has two members.
pub fn breeding_pool_size(size: usize, percent: f32) -> usize {
    let pool = (size as f32 * percent).round() as usize;
    pool.max(size.min(2)).min(size)
}

/// Two distinct pool indices, or the same one when the pool has one member.
pub fn pick_parents(pool_len: usize, rng: &mut dyn RngCore) -> (usize, usize) {
    let a = rng.random_range(0..pool_len);
    if pool_len < 2 {
        return (a, a);
    }
    let mut b = rng.random_range(0..pool_len);
    while b == a {
        b = rng.random_range(0..pool_len);
    }
    (a, b)
}

fn should_replace_champion(best: f32, champion: Option<f32>, threshold: f32) -> bool {
    best > champion.unwrap_or(0.0) + threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, SimulationEvent};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::Cell;

    fn setup(settings: &Settings) -> (Population, PhysicsWorld, SmallRng) {
        let mut world = PhysicsWorld::new(&settings.physics);
        world.insert_ground_edge([-20.0, 0.0], [200.0, 0.0]);
        let population = Population::new(settings, [0.0, settings.vehicle.spawn_height()]);
        (population, world, SmallRng::seed_from_u64(12))
    }

    fn count(population: &Population, kind: EntityType) -> usize {
        population
            .cars()
            .iter()
            .filter(|car| car.kind() == kind)
            .count()
    }

    fn genomes(population: &Population) -> Vec<Genome> {
        population.cars().iter().map(Car::genome).cloned().collect()
    }

    /// Passes the up-front check, then returns a short child from its second
    /// crossover on.
    struct BreaksLater {
        seen: Cell<u32>,
    }

    impl GeneticOperators for BreaksLater {
        fn mutate(&self, _bits: &mut String, _rng: &mut dyn RngCore) {}

        fn crossover(&self, a: &str, _b: &str, _rng: &mut dyn RngCore) -> String {
            self.seen.set(self.seen.get() + 1);
            if self.seen.get() > 1 {
                a[1..].to_string()
            } else {
                a.to_string()
            }
        }

        fn name(&self) -> &str {
            "breaks-later"
        }
    }

    struct Truncating;

    impl GeneticOperators for Truncating {
        fn mutate(&self, bits: &mut String, _rng: &mut dyn RngCore) {
            bits.pop();
        }

        fn crossover(&self, a: &str, _b: &str, _rng: &mut dyn RngCore) -> String {
            a.to_string()
        }
    }

    #[test]
    fn generate_builds_random_cars() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        let mut log = EventLog::new();
        population.generate(&mut world, &mut rng, &mut log).unwrap();
        assert_eq!(population.generation(), 1);
        assert_eq!(population.cars().len(), 20);
        assert_eq!(count(&population, EntityType::Random), 20);
        assert_eq!(population.live_count(), 20);
        for (i, car) in population.cars().iter().enumerate() {
            assert_eq!(car.id(), VehicleId::Slot(i));
            assert_eq!(population.get_car(i).map(Car::id), Some(VehicleId::Slot(i)));
        }
        let generations: Vec<_> = log.generations().map(|(g, cars)| (g, cars.len())).collect();
        assert_eq!(generations, vec![(1, 20)]);
        // ground + chassis and two wheels per car
        assert_eq!(world.body_count(), 1 + 20 * 3);
    }

    #[test]
    fn next_generation_mixes_clones_children_and_randoms() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();
        let before = genomes(&population);

        let summary = population
            .next_generation(&mut world, &mut rng, &mut ())
            .unwrap();
        assert_eq!(summary.generation, 1);
        assert_eq!(population.generation(), 2);
        assert_eq!(population.cars().len(), 20);
        assert_eq!(count(&population, EntityType::Clone), 2);
        assert_eq!(count(&population, EntityType::Random), 2);
        assert_eq!(count(&population, EntityType::Normal), 16);
        // Nobody moved, so the ranking keeps slot order and the clones are
        // the first two genomes.
        assert_eq!(population.cars()[0].genome(), &before[0]);
        assert_eq!(population.cars()[1].genome(), &before[1]);
        assert_eq!(world.body_count(), 1 + 20 * 3);
    }

    #[test]
    fn tunables_reject_bad_values_and_keep_the_old_ones() {
        let settings = Settings::default();
        let (mut population, _world, _rng) = setup(&settings);
        assert!(matches!(
            population.set_num_clones(19),
            Err(TunableError::NumClones { available: 18, .. })
        ));
        assert_eq!(population.num_clones(), 2);
        assert!(population.set_num_random(30).is_err());
        assert_eq!(population.num_random(), 2);
        assert!(population.set_mutation_rate(1.5).is_err());
        assert!(population.set_mutation_rate(f32::NAN).is_err());
        assert_eq!(population.mutation_rate(), 0.1);

        population.set_num_clones(5).unwrap();
        population.set_num_random(15).unwrap();
        population.set_mutation_rate(0.0).unwrap();
        assert_eq!(
            (population.num_clones(), population.num_random(), population.mutation_rate()),
            (5, 15, 0.0)
        );
    }

    #[test]
    fn tunables_apply_at_the_next_generation() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();
        population.set_num_clones(4).unwrap();
        assert_eq!(count(&population, EntityType::Clone), 0);
        population
            .next_generation(&mut world, &mut rng, &mut ())
            .unwrap();
        assert_eq!(count(&population, EntityType::Clone), 4);
    }

    #[test]
    fn broken_operators_are_rejected_up_front() {
        let settings = Settings::default();
        let (mut population, _world, mut rng) = setup(&settings);
        let result = population.set_operators(Box::new(Truncating), &mut rng);
        assert!(matches!(result, Err(OperatorError::Mutation(_))));
        assert_eq!(population.operators_name(), "default");
    }

    #[test]
    fn invalid_child_aborts_the_generation() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();
        population
            .set_operators(Box::new(BreaksLater { seen: Cell::new(0) }), &mut rng)
            .unwrap();
        let before = genomes(&population);

        let result = population.next_generation(&mut world, &mut rng, &mut ());
        assert!(matches!(result, Err(Error::Operator(OperatorError::Crossover(_)))));
        assert_eq!(population.generation(), 1);
        let after = genomes(&population);
        assert_eq!(before, after);
        assert_eq!(population.live_count(), 20);
    }

    #[test]
    fn empty_population_cannot_turn_over() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        let result = population.next_generation(&mut world, &mut rng, &mut ());
        assert!(matches!(result, Err(Error::EmptyPopulation)));
        assert_eq!(population.generation(), 0);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn leader_is_the_furthest_live_car_and_ties_go_low() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();
        assert_eq!(population.leader(), None);
        let dt = settings.physics.tick_seconds;
        let drive = |population: &mut Population, slot: usize, dx: f32| {
            let entity = &mut population.cars[slot].entity;
            let start = entity.start_position();
            entity.track_motion([start[0] + dx, start[1]], dt);
        };

        drive(&mut population, 5, 3.0);
        drive(&mut population, 2, 3.0);
        population.refresh_leader();
        assert_eq!(population.leader(), Some(VehicleId::Slot(2)));

        drive(&mut population, 5, 4.0);
        population.refresh_leader();
        assert_eq!(population.leader(), Some(VehicleId::Slot(5)));

        population.cars[5].entity.destroy(&mut world);
        population.refresh_leader();
        assert_eq!(population.leader(), Some(VehicleId::Slot(2)));
    }

    #[test]
    fn update_reports_health_loss_before_each_death() {
        let mut settings = Settings::default();
        settings.population.size = 4;
        settings.population.num_clones = 1;
        settings.population.num_random = 1;
        settings.health.speed_history_secs = 2;
        settings.health.samples_per_sec = 2;
        settings.health.low_speed_threshold = 1000.0;
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();

        let mut log = EventLog::new().with_health();
        let dt = settings.physics.tick_seconds;
        let mut summary = None;
        for _ in 0..(60 * 10) {
            population.pre_step(&mut world, dt).unwrap();
            for contact in world.step(dt) {
                population.handle_contact(&contact);
            }
            summary = population
                .update(&mut world, &mut rng, dt, &mut log)
                .unwrap();
            if summary.is_some() {
                break;
            }
        }
        assert!(summary.is_some(), "every car stalls");

        let events = log.events();
        let turnover = events
            .iter()
            .position(|event| match event {
                SimulationEvent::NewGeneration { generation, .. } => *generation == 2,
                _ => false,
            })
            .expect("generation 2 announced");
        for slot in 0..4 {
            let id = VehicleId::Slot(slot);
            let mut fractions = Vec::new();
            let mut died = false;
            for event in &events[..turnover] {
                match event {
                    SimulationEvent::HealthChanged { id: who, fraction } if *who == id => {
                        assert!(!died, "health reported after car {id} died");
                        fractions.push(*fraction);
                    }
                    SimulationEvent::VehicleDied { id: who, .. } if *who == id => died = true,
                    _ => {}
                }
            }
            assert!(died, "car {id} never died");
            assert_eq!(fractions, vec![0.75, 0.5, 0.25, 0.0], "car {id}");
        }
    }

    #[test]
    fn dispose_clears_the_world() {
        let settings = Settings::default();
        let (mut population, mut world, mut rng) = setup(&settings);
        population.generate(&mut world, &mut rng, &mut ()).unwrap();
        population.dispose(&mut world);
        assert!(population.cars().is_empty());
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn pool_size_rounds_and_keeps_two_parents() {
        assert_eq!(breeding_pool_size(20, 0.5), 10);
        assert_eq!(breeding_pool_size(20, 0.01), 2);
        assert_eq!(breeding_pool_size(1, 0.5), 1);
        assert_eq!(breeding_pool_size(5, 1.0), 5);
    }

    #[test]
    fn parents_differ_when_possible() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..200 {
            let (a, b) = pick_parents(2, &mut rng);
            assert_ne!(a, b);
            assert!(a < 2 && b < 2);
        }
        assert_eq!(pick_parents(1, &mut rng), (0, 0));
    }

    #[test]
    fn champion_needs_a_margin() {
        assert!(!should_replace_champion(0.05, None, 0.1));
        assert!(should_replace_champion(0.2, None, 0.1));
        assert!(!should_replace_champion(10.05, Some(10.0), 0.1));
        assert!(should_replace_champion(10.2, Some(10.0), 0.1));
    }
}
