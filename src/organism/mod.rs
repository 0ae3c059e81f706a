//! Organism structure and behavior.
//!
//! Herbivores and carnivores share one lifecycle (ageing, moving, feeding,
//! dividing) and differ in their [`Kind`] payload.

pub mod movement;
pub mod species;

pub use species::{Carnivore, Herbivore, HuntingStrategy, Lineage};

use crate::config::Config;
use crate::genetics::{Genome, TraitAllocator, CARNIVORE_TRAITS, HERBIVORE_TRAITS};
use crate::grid::{FoodGrid, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unique organism identifier
pub type OrganismId = u64;

/// Species role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Herbivore,
    Carnivore,
}

impl Role {
    /// Length of the species trait vector
    pub fn trait_count(&self) -> usize {
        match self {
            Role::Herbivore => HERBIVORE_TRAITS,
            Role::Carnivore => CARNIVORE_TRAITS,
        }
    }

    /// Trait indices bound by the species tradeoff
    pub fn constrained_pair(&self) -> (usize, usize) {
        match self {
            Role::Herbivore => (crate::genetics::herbivore::LIFESPAN, crate::genetics::herbivore::SPEED),
            Role::Carnivore => (crate::genetics::carnivore::SPEED, crate::genetics::carnivore::STEALTH),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Herbivore => "herbivore",
            Role::Carnivore => "carnivore",
        }
    }
}

/// Species payload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Kind {
    Herbivore(Herbivore),
    Carnivore(Carnivore),
}

/// What an organism did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    Resting,
    Fleeing,
    Foraging,
    Hunting,
    Wandering,
}

/// Cause of death tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    OldAge,
    Predation,
    Starvation,
}

/// Monotonic id source owned by a world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: OrganismId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id
    pub fn allocate(&mut self) -> OrganismId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Make sure an externally assigned id is never handed out again
    pub fn reserve(&mut self, id: OrganismId) {
        self.next = self.next.max(id + 1);
    }
}

/// Frame-start view of another organism
#[derive(Debug, Clone, PartialEq)]
pub struct PeerView {
    pub id: OrganismId,
    pub position: Position,
    pub role: Role,
    /// Carnivore lineage, `None` for herbivores
    pub lineage: Option<Lineage>,
}

/// Read-only world state an organism sees while moving
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub frame: u64,
    pub grid_size: usize,
    pub food: &'a FoodGrid,
    pub peers: &'a [PeerView],
    pub config: &'a Config,
}

/// An organism in the simulation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub position: Position,
    pub genome: Genome,
    /// Accrues `movement_cost * (1 + fear)` per frame
    pub age: f64,
    pub lifespan: u32,
    pub frames_since_last_food: u64,
    pub kind: Kind,
}

impl Organism {
    /// Create a herbivore from a genome with a freshly drawn carnivore sense
    pub fn herbivore<R: Rng + ?Sized>(
        id: OrganismId,
        position: Position,
        genome: Genome,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let sense = species::founder_sense(config, rng);
        let (herbivore, lifespan) = Herbivore::express(&genome, config, sense);
        Self::assemble(id, position, genome, lifespan, Kind::Herbivore(herbivore))
    }

    /// Create a carnivore; without a parent lineage it founds its own
    pub fn carnivore<R: Rng + ?Sized>(
        id: OrganismId,
        position: Position,
        genome: Genome,
        parent_lineage: Option<&Lineage>,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let lineage = match parent_lineage {
            Some(parent) => parent.descend(id),
            None => Lineage::founded(id),
        };
        let (carnivore, lifespan) = Carnivore::express(&genome, config, lineage, rng);
        Self::assemble(id, position, genome, lifespan, Kind::Carnivore(carnivore))
    }

    /// Generation-zero organism with a founder genome
    pub fn founder<R: Rng + ?Sized>(
        id: OrganismId,
        role: Role,
        position: Position,
        allocator: &TraitAllocator,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let genome = allocator.founder(role, 0, rng).genome;
        match role {
            Role::Herbivore => Self::herbivore(id, position, genome, config, rng),
            Role::Carnivore => Self::carnivore(id, position, genome, None, config, rng),
        }
    }

    fn assemble(id: OrganismId, position: Position, genome: Genome, lifespan: u32, kind: Kind) -> Self {
        Self {
            id,
            position,
            genome,
            age: 0.0,
            lifespan,
            frames_since_last_food: 0,
            kind,
        }
    }

    #[inline]
    pub fn role(&self) -> Role {
        match self.kind {
            Kind::Herbivore(_) => Role::Herbivore,
            Kind::Carnivore(_) => Role::Carnivore,
        }
    }

    #[inline]
    pub fn is_herbivore(&self) -> bool {
        matches!(self.kind, Kind::Herbivore(_))
    }

    #[inline]
    pub fn is_carnivore(&self) -> bool {
        matches!(self.kind, Kind::Carnivore(_))
    }

    pub fn herbivore_state(&self) -> Option<&Herbivore> {
        match &self.kind {
            Kind::Herbivore(h) => Some(h),
            Kind::Carnivore(_) => None,
        }
    }

    pub fn herbivore_state_mut(&mut self) -> Option<&mut Herbivore> {
        match &mut self.kind {
            Kind::Herbivore(h) => Some(h),
            Kind::Carnivore(_) => None,
        }
    }

    pub fn carnivore_state(&self) -> Option<&Carnivore> {
        match &self.kind {
            Kind::Carnivore(c) => Some(c),
            Kind::Herbivore(_) => None,
        }
    }

    pub fn carnivore_state_mut(&mut self) -> Option<&mut Carnivore> {
        match &mut self.kind {
            Kind::Carnivore(c) => Some(c),
            Kind::Herbivore(_) => None,
        }
    }

    /// Fear level (always 0 for carnivores)
    #[inline]
    pub fn fear(&self) -> f64 {
        self.herbivore_state().map_or(0.0, |h| h.fear)
    }

    pub fn speed(&self) -> f64 {
        match &self.kind {
            Kind::Herbivore(h) => h.speed,
            Kind::Carnivore(c) => c.speed,
        }
    }

    pub fn food_gene(&self) -> f64 {
        match &self.kind {
            Kind::Herbivore(h) => h.food_gene,
            Kind::Carnivore(c) => c.food_gene,
        }
    }

    pub fn energy_efficiency(&self) -> f64 {
        match &self.kind {
            Kind::Herbivore(h) => h.energy_efficiency,
            Kind::Carnivore(c) => c.energy_efficiency,
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.genome.generation
    }

    pub fn lineage(&self) -> Option<&Lineage> {
        self.carnivore_state().map(|c| &c.lineage)
    }

    /// Snapshot used by other organisms during the move phase
    pub fn peer_view(&self) -> PeerView {
        PeerView {
            id: self.id,
            position: self.position,
            role: self.role(),
            lineage: self.lineage().cloned(),
        }
    }

    /// Age, then compute and apply one move
    pub fn advance<R: Rng + ?Sized>(&mut self, ctx: &FrameContext<'_>, rng: &mut R) -> Behavior {
        self.age += ctx.config.world.movement_cost * (1.0 + self.fear());
        self.frames_since_last_food += 1;

        let position = &mut self.position;
        match &mut self.kind {
            Kind::Herbivore(h) => h.advance(position, ctx, rng),
            Kind::Carnivore(c) => c.advance(position, ctx, rng),
        }
    }

    /// Reached the end of its lifespan
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.age >= self.lifespan as f64
    }

    /// Record a meal (food for herbivores, prey for carnivores)
    pub fn on_fed(&mut self) {
        self.frames_since_last_food = 0;
    }

    /// Record a kill: fed, then rest
    pub fn on_kill(&mut self, rest_cooldown: u32) {
        self.on_fed();
        if let Some(c) = self.carnivore_state_mut() {
            c.rest_timer = rest_cooldown;
        }
    }

    /// Produce one offspring at the same position
    pub fn divide<R: Rng + ?Sized>(
        &self,
        child_id: OrganismId,
        allocator: &TraitAllocator,
        config: &Config,
        carnivores_exist: bool,
        rng: &mut R,
    ) -> Organism {
        match &self.kind {
            Kind::Carnivore(parent) => {
                let genome = allocator.inherit(Role::Carnivore, &self.genome, rng).genome;
                Organism::carnivore(child_id, self.position, genome, Some(&parent.lineage), config, rng)
            }
            Kind::Herbivore(parent) => {
                let emergence = if carnivores_exist {
                    config.reproduction.carnivore_emergence_rate_established
                } else {
                    config.reproduction.carnivore_emergence_rate
                };
                if rng.gen::<f64>() < emergence {
                    let genome = allocator
                        .founder(Role::Carnivore, self.genome.generation + 1, rng)
                        .genome;
                    log::debug!("Herbivore {} produced carnivore {}", self.id, child_id);
                    return Organism::carnivore(child_id, self.position, genome, None, config, rng);
                }

                let genome = allocator.inherit(Role::Herbivore, &self.genome, rng).genome;
                let mut child = Organism::herbivore(child_id, self.position, genome, config, rng);
                if let Some(h) = child.herbivore_state_mut() {
                    h.known_carnivores = parent.known_carnivores.clone();
                    h.carnivore_sense = species::inherited_sense(parent.carnivore_sense, config, rng);
                    h.spatial_memory = parent.spatial_memory.inherit(h.spatial_memory.capacity());
                }
                child
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Config, TraitAllocator, ChaCha8Rng) {
        let config = Config::default();
        let allocator = TraitAllocator::new(&config.genetics);
        (config, allocator, ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), 0);
        assert_eq!(ids.allocate(), 1);
        ids.reserve(0);
        assert_eq!(ids.allocate(), 2);
        ids.reserve(9);
        assert_eq!(ids.allocate(), 10);
    }

    #[test]
    fn test_founder_roles() {
        let (config, allocator, mut rng) = setup();
        let herb = Organism::founder(0, Role::Herbivore, Position::new(1, 1), &allocator, &config, &mut rng);
        let carn = Organism::founder(1, Role::Carnivore, Position::new(2, 2), &allocator, &config, &mut rng);

        assert_eq!(herb.role(), Role::Herbivore);
        assert_eq!(carn.role(), Role::Carnivore);
        assert_eq!(herb.generation(), 0);
        assert!(herb.lineage().is_none());
        assert_eq!(carn.lineage(), Some(&Lineage::founded(1)));
        assert_eq!(carn.fear(), 0.0);
        let sense = herb.herbivore_state().unwrap().carnivore_sense;
        assert!((0.0..=1.0).contains(&sense));
    }

    #[test]
    fn test_advance_ages_by_fear() {
        let (config, allocator, mut rng) = setup();
        let mut herb = Organism::founder(0, Role::Herbivore, Position::new(5, 5), &allocator, &config, &mut rng);
        let food = FoodGrid::new(config.world.grid_size);
        let ctx = FrameContext {
            frame: 1,
            grid_size: config.world.grid_size,
            food: &food,
            peers: &[],
            config: &config,
        };

        herb.advance(&ctx, &mut rng);
        // Age uses the fear level before this frame's decay
        assert!((herb.age - 1.2).abs() < 1e-12);
        assert_eq!(herb.frames_since_last_food, 1);
        assert!((herb.fear() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_is_dead_at_lifespan() {
        let (config, allocator, mut rng) = setup();
        let mut org = Organism::founder(0, Role::Carnivore, Position::new(0, 0), &allocator, &config, &mut rng);
        org.age = org.lifespan as f64 - 0.5;
        assert!(!org.is_dead());
        org.age = org.lifespan as f64;
        assert!(org.is_dead());
    }

    #[test]
    fn test_on_kill_sets_rest() {
        let (config, allocator, mut rng) = setup();
        let mut carn = Organism::founder(0, Role::Carnivore, Position::new(0, 0), &allocator, &config, &mut rng);
        carn.frames_since_last_food = 40;
        carn.on_kill(10);
        assert_eq!(carn.frames_since_last_food, 0);
        assert_eq!(carn.carnivore_state().unwrap().rest_timer, 10);
    }

    #[test]
    fn test_carnivore_division_extends_lineage() {
        let (config, allocator, mut rng) = setup();
        let parent = Organism::founder(3, Role::Carnivore, Position::new(4, 4), &allocator, &config, &mut rng);
        let child = parent.divide(8, &allocator, &config, true, &mut rng);

        assert!(child.is_carnivore());
        assert_eq!(child.position, parent.position);
        assert_eq!(child.generation(), 1);
        let lineage = child.lineage().unwrap();
        assert!(lineage.contains(3) && lineage.contains(8));
    }

    #[test]
    fn test_herbivore_division_inherits_knowledge() {
        let (mut config, allocator, mut rng) = setup();
        config.reproduction.carnivore_emergence_rate = 0.0;
        let mut parent = Organism::founder(0, Role::Herbivore, Position::new(4, 4), &allocator, &config, &mut rng);
        parent.herbivore_state_mut().unwrap().learn([11, 12]);

        let child = parent.divide(1, &allocator, &config, false, &mut rng);
        let h = child.herbivore_state().unwrap();
        assert_eq!(h.known_carnivores.len(), 2);
        assert_eq!(child.generation(), 1);
        assert_eq!(h.fear, config.fear.initial_fear);
        assert!((0.0..=1.0).contains(&h.carnivore_sense));
    }

    #[test]
    fn test_herbivore_can_found_carnivore_lineage() {
        let (mut config, allocator, mut rng) = setup();
        config.reproduction.carnivore_emergence_rate = 1.0;
        let parent = Organism::founder(0, Role::Herbivore, Position::new(4, 4), &allocator, &config, &mut rng);

        let child = parent.divide(5, &allocator, &config, false, &mut rng);
        assert!(child.is_carnivore());
        assert_eq!(child.lineage(), Some(&Lineage::founded(5)));
        assert_eq!(child.genome.shares.len(), CARNIVORE_TRAITS);
        assert_eq!(child.generation(), 1);
    }
}
