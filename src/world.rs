//! World simulation engine - main simulation loop.

use crate::config::Config;
use crate::events::{FoodEvent, FoodEventSystem};
use crate::fear::{FearNetwork, PropagationReport};
use crate::genetics::TraitAllocator;
use crate::grid::{FoodGrid, Position};
use crate::organism::{DeathCause, FrameContext, IdAllocator, Organism, OrganismId, PeerView, Role};
use crate::stats::{Stats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Positions after a frame, for renderers
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub frame: u64,
    pub herbivores: Vec<Position>,
    pub carnivores: Vec<Position>,
    pub food: Vec<Position>,
}

/// The simulation world
pub struct World<R: Rng = ChaCha8Rng> {
    // Population
    pub organisms: Vec<Organism>,

    // Environment
    pub food_grid: FoodGrid,
    pub events: FoodEventSystem,

    // State: frame after the last `update`
    pub time: u64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,

    allocator: TraitAllocator,
    fear_network: FearNetwork,
    ids: IdAllocator,

    // Bookkeeping keyed by organism id
    food_touch: HashMap<OrganismId, u64>,
    last_meal: HashMap<OrganismId, u64>,

    extinction_logged: bool,

    // Random number generator (seeded for reproducibility)
    rng: R,
    seed: Option<u64>,
}

impl World<ChaCha8Rng> {
    /// Create a new world with the given configuration
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut world = Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed));
        world.seed = Some(seed);
        world
    }
}

impl<R: Rng> World<R> {
    /// Create a world drawing all randomness from `rng`
    pub fn with_rng(config: Config, rng: R) -> Self {
        let grid_size = config.world.grid_size;
        let food_grid = FoodGrid::seeded(grid_size, config.world.initial_food, config.world.food_seed);
        let events = FoodEventSystem::new(&config.food_events, config.world.initial_food);

        let mut world = Self {
            organisms: Vec::new(),
            food_grid,
            events,
            time: 0,
            allocator: TraitAllocator::new(&config.genetics),
            fear_network: FearNetwork::new(&config),
            stats: Stats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            config,
            ids: IdAllocator::new(),
            food_touch: HashMap::new(),
            last_meal: HashMap::new(),
            extinction_logged: false,
            rng,
            seed: None,
        };

        // Initial population
        let mut founders = Vec::new();
        for _ in 0..world.config.world.initial_herbivores {
            let pos = Position::random(&mut world.rng, grid_size);
            founders.push(world.create_organism(Role::Herbivore, pos));
        }
        for _ in 0..world.config.world.initial_carnivores {
            let pos = Position::random(&mut world.rng, grid_size);
            founders.push(world.create_organism(Role::Carnivore, pos));
        }
        world.add_organisms(founders);

        world.stats.update(&world.organisms, world.food_grid.len(), world.events.current);
        world
    }

    /// Build a generation-zero organism with a fresh id (not yet added)
    pub fn create_organism(&mut self, role: Role, position: Position) -> Organism {
        let id = self.ids.allocate();
        let position = position.clamped(self.config.world.grid_size);
        Organism::founder(id, role, position, &self.allocator, &self.config, &mut self.rng)
    }

    /// Add organisms; carnivores start their meal timer now
    pub fn add_organisms(&mut self, organisms: Vec<Organism>) {
        for mut org in organisms {
            org.position = org.position.clamped(self.config.world.grid_size);
            self.ids.reserve(org.id);
            if org.is_carnivore() {
                self.last_meal.insert(org.id, self.time);
            }
            self.organisms.push(org);
        }
    }

    /// Start a food event directly
    pub fn force_food_event(&mut self, event: FoodEvent, duration: u64) {
        log::info!("Food event forced: {} for {} frames", event, duration);
        self.events.force(event, duration, &self.config.food_events);
    }

    /// Advance one frame
    pub fn update(&mut self, frame: u64) -> Snapshot {
        self.stats.reset_counters();

        // Phase 1: Food events
        self.events.advance(&self.config.food_events, &mut self.rng);

        // Phase 2: Movement against a frame-start snapshot
        let mut removed: HashSet<usize> = HashSet::new();
        let mut removals: Vec<(OrganismId, DeathCause)> = Vec::new();
        self.move_organisms(frame, &mut removed, &mut removals);

        // Phase 3: Feeding, predation and division
        let births = self.resolve_interactions(frame, &mut removed, &mut removals);

        // Phase 4: Starvation
        self.check_starvation(frame, &mut removed, &mut removals);

        // Phase 5: Commit
        self.commit(frame, removals, births);

        // Phase 6: Food respawn and top-up
        self.update_food(frame);

        // Phase 7: Statistics
        self.update_stats(frame);

        self.time = frame + 1;
        self.snapshot(frame)
    }

    fn move_organisms(
        &mut self,
        frame: u64,
        removed: &mut HashSet<usize>,
        removals: &mut Vec<(OrganismId, DeathCause)>,
    ) {
        let peers: Vec<PeerView> = self.organisms.iter().map(Organism::peer_view).collect();
        let mut propagation = PropagationReport::default();

        for idx in 0..self.organisms.len() {
            if self.organisms[idx].is_herbivore() {
                let report = self.fear_network.propagate(idx, &mut self.organisms);
                propagation.relays += report.relays;
                propagation.informed += report.informed;
            }

            let ctx = FrameContext {
                frame,
                grid_size: self.config.world.grid_size,
                food: &self.food_grid,
                peers: &peers,
                config: &self.config,
            };
            let behavior = self.organisms[idx].advance(&ctx, &mut self.rng);
            self.stats.behaviors.record(behavior);

            if self.organisms[idx].is_dead() {
                removed.insert(idx);
                removals.push((self.organisms[idx].id, DeathCause::OldAge));
            }
        }

        if propagation.relays > 0 {
            log::debug!(
                "Frame {}: {} fear relays informed {} herbivores",
                frame,
                propagation.relays,
                propagation.informed
            );
        }
    }

    fn resolve_interactions(
        &mut self,
        frame: u64,
        removed: &mut HashSet<usize>,
        removals: &mut Vec<(OrganismId, DeathCause)>,
    ) -> Vec<Organism> {
        let mut births = Vec::new();
        let carnivores_exist = self.organisms.iter().any(|o| o.is_carnivore());

        for idx in 0..self.organisms.len() {
            if removed.contains(&idx) {
                continue;
            }
            let id = self.organisms[idx].id;
            let pos = self.organisms[idx].position;

            match self.organisms[idx].role() {
                Role::Herbivore => {
                    if self.food_grid.consume(pos, frame) {
                        self.food_touch.insert(id, frame);
                        self.organisms[idx].on_fed();
                    }

                    let ready = self
                        .food_touch
                        .get(&id)
                        .map_or(false, |&touch| frame.saturating_sub(touch) >= self.config.reproduction.herbivore_touch_frames);
                    if ready {
                        self.food_touch.remove(&id);
                        let child_id = self.ids.allocate();
                        births.push(self.organisms[idx].divide(
                            child_id,
                            &self.allocator,
                            &self.config,
                            carnivores_exist,
                            &mut self.rng,
                        ));
                    }
                }
                Role::Carnivore => {
                    let prey = (0..self.organisms.len()).find(|&j| {
                        j != idx
                            && !removed.contains(&j)
                            && self.organisms[j].is_herbivore()
                            && self.organisms[j].position == pos
                    });
                    let Some(prey) = prey else { continue };

                    removed.insert(prey);
                    removals.push((self.organisms[prey].id, DeathCause::Predation));
                    self.last_meal.insert(id, frame);
                    self.organisms[idx].on_kill(self.config.predation.rest_cooldown);

                    if let Some(lineage) = self.organisms[idx].lineage().cloned() {
                        let report = self.fear_network.witness_kill(&mut self.organisms, &lineage, pos, removed);
                        log::debug!(
                            "Frame {}: carnivore {} killed {}, {} witnesses",
                            frame,
                            id,
                            removals.last().map_or(0, |r| r.0),
                            report.witnesses
                        );
                    }

                    if self.rng.gen::<f64>() < self.config.reproduction.carnivore_division_probability {
                        let child_id = self.ids.allocate();
                        births.push(self.organisms[idx].divide(
                            child_id,
                            &self.allocator,
                            &self.config,
                            true,
                            &mut self.rng,
                        ));
                    }
                }
            }
        }

        births
    }

    fn check_starvation(
        &mut self,
        frame: u64,
        removed: &mut HashSet<usize>,
        removals: &mut Vec<(OrganismId, DeathCause)>,
    ) {
        let starvation_time = self.config.predation.starvation_time;
        for (idx, org) in self.organisms.iter().enumerate() {
            if !org.is_carnivore() || removed.contains(&idx) {
                continue;
            }
            let last_meal = *self.last_meal.entry(org.id).or_insert(frame);
            if frame.saturating_sub(last_meal) >= starvation_time {
                removed.insert(idx);
                removals.push((org.id, DeathCause::Starvation));
            }
        }
    }

    fn commit(&mut self, frame: u64, removals: Vec<(OrganismId, DeathCause)>, births: Vec<Organism>) {
        let mut dead: HashSet<OrganismId> = HashSet::with_capacity(removals.len());
        for (id, cause) in removals {
            if dead.insert(id) {
                self.stats.record_death(cause);
                self.food_touch.remove(&id);
                self.last_meal.remove(&id);
            }
        }
        self.organisms.retain(|o| !dead.contains(&o.id));

        self.stats.births = births.len();
        for child in births {
            if child.is_carnivore() {
                self.last_meal.insert(child.id, frame);
            }
            self.organisms.push(child);
        }

        if self.organisms.is_empty() {
            if !self.extinction_logged {
                log::info!("Extinction at frame {}", frame);
                self.extinction_logged = true;
            }
        } else {
            self.extinction_logged = false;
        }
    }

    fn update_food(&mut self, frame: u64) {
        self.food_grid.respawn_due(frame, self.events.respawn_delay);
        self.food_grid.top_up(
            self.events.target_food,
            self.config.food_events.top_up_retry_factor,
            &mut self.rng,
        );
    }

    fn update_stats(&mut self, frame: u64) {
        self.stats.frame = frame;
        self.stats.update(&self.organisms, self.food_grid.len(), self.events.current);

        // Record history
        if frame % self.config.logging.stats_interval.max(1) == 0 {
            log::debug!("{}", self.stats.summary());
            self.stats_history.record(self.stats.clone());
        }
    }

    /// Stats for the current state, labelled with `frame`
    pub fn get_stats(&self, frame: u64) -> Stats {
        let mut stats = self.stats.clone();
        stats.frame = frame;
        stats.update(&self.organisms, self.food_grid.len(), self.events.current);
        stats
    }

    /// Current positions
    pub fn snapshot(&self, frame: u64) -> Snapshot {
        let mut snapshot = Snapshot {
            frame,
            food: self.food_grid.positions().collect(),
            ..Default::default()
        };
        for org in &self.organisms {
            match org.role() {
                Role::Herbivore => snapshot.herbivores.push(org.position),
                Role::Carnivore => snapshot.carnivores.push(org.position),
            }
        }
        snapshot
    }

    /// Main simulation step over the internal frame counter
    pub fn step(&mut self) {
        self.update(self.time);
    }

    /// Run simulation for specified number of frames
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.step();
        }
    }

    /// Run simulation with callback for progress updates
    pub fn run_with_callback<F>(&mut self, frames: u64, mut callback: F)
    where
        F: FnMut(&World<R>, u64),
    {
        for i in 0..frames {
            self.step();
            callback(self, i);
        }
    }

    /// Get current population count
    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    pub fn herbivore_count(&self) -> usize {
        self.organisms.iter().filter(|o| o.is_herbivore()).count()
    }

    pub fn carnivore_count(&self) -> usize {
        self.organisms.iter().filter(|o| o.is_carnivore()).count()
    }

    /// Check if population is extinct
    pub fn is_extinct(&self) -> bool {
        self.organisms.is_empty()
    }

    /// Look up an organism by id
    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.iter().find(|o| o.id == id)
    }

    /// Get seed for reproducibility (None for an injected RNG)
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.world.grid_size = 30;
        config.world.initial_herbivores = 10;
        config.world.initial_carnivores = 2;
        config.world.initial_food = 40;
        config
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.world.grid_size = 20;
        config.world.initial_herbivores = 0;
        config.world.initial_carnivores = 0;
        config.world.initial_food = 0;
        config.food_events.trigger_probability = 0.0;
        config.reproduction.carnivore_emergence_rate = 0.0;
        config.reproduction.carnivore_emergence_rate_established = 0.0;
        config
    }

    #[test]
    fn test_world_creation() {
        let config = test_config();
        let world = World::new(config);

        assert_eq!(world.herbivore_count(), 10);
        assert_eq!(world.carnivore_count(), 2);
        assert_eq!(world.time, 0);
        assert!(world.food_grid.len() <= 40);
    }

    #[test]
    fn test_world_step() {
        let mut world = World::new_with_seed(test_config(), 1);
        world.step();

        assert_eq!(world.time, 1);
        assert_eq!(world.stats.frame, 0);
        assert!(world.population() > 0 || world.is_extinct());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut world = World::new_with_seed(test_config(), 3);
        world.run(300);
        let ids: HashSet<_> = world.organisms.iter().map(|o| o.id).collect();
        assert_eq!(ids.len(), world.population());
    }

    #[test]
    fn test_reproducibility() {
        let mut world1 = World::new_with_seed(test_config(), 42);
        let mut world2 = World::new_with_seed(test_config(), 42);

        world1.run(200);
        world2.run(200);

        assert_eq!(world1.snapshot(200), world2.snapshot(200));
        assert_eq!(world1.seed(), Some(42));
    }

    #[test]
    fn test_with_rng_has_no_seed() {
        let world = World::with_rng(quiet_config(), StdRng::seed_from_u64(0));
        assert!(world.seed().is_none());
        assert!(world.is_extinct());
    }

    #[test]
    fn test_add_organisms_reserves_ids() {
        let config = quiet_config();
        let mut world = World::new_with_seed(config.clone(), 5);
        let allocator = TraitAllocator::new(&config.genetics);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outsider = Organism::founder(40, Role::Carnivore, Position::new(3, 3), &allocator, &config, &mut rng);
        world.add_organisms(vec![outsider]);

        let next = world.create_organism(Role::Herbivore, Position::new(0, 0));
        assert!(next.id > 40);
    }

    #[test]
    fn test_get_stats_has_no_side_effects() {
        let mut world = World::new_with_seed(test_config(), 9);
        world.run(10);
        let before = world.stats_history.len();
        let stats = world.get_stats(777);
        assert_eq!(stats.frame, 777);
        assert_eq!(stats.population(), world.population());
        assert_eq!(world.stats_history.len(), before);
        assert_eq!(world.time, 10);
    }

    #[test]
    fn test_old_age_removal() {
        let config = quiet_config();
        let mut world = World::new_with_seed(config, 2);
        let mut org = world.create_organism(Role::Herbivore, Position::new(5, 5));
        org.lifespan = 2;
        world.add_organisms(vec![org]);

        world.step();
        assert_eq!(world.population(), 1);
        world.step();
        assert!(world.is_extinct());
        assert_eq!(world.stats.deaths_old_age, 1);
    }

    #[test]
    fn test_zero_stats_interval_records_every_frame() {
        let mut config = test_config();
        config.logging.stats_interval = 0;
        let mut world = World::new_with_seed(config, 6);
        world.run(5);
        assert_eq!(world.stats_history.len(), 5);
    }

    #[test]
    fn test_history_interval() {
        let mut config = test_config();
        config.logging.stats_interval = 25;
        let mut world = World::new_with_seed(config, 4);
        world.run(100);
        assert_eq!(world.stats_history.len(), 4);
        assert_eq!(world.stats_history.snapshots[1].frame, 25);
    }
}
