//! Species-specific state and per-frame behaviour.

use super::movement::{random_step, step_away, step_toward};
use super::{Behavior, FrameContext, OrganismId, PeerView, Role};
use crate::config::Config;
use crate::genetics::{carnivore as ct, gaussian, herbivore as ht, Genome};
use crate::grid::Position;
use crate::memory::{decay_exponent, MemoryContext, SpatialMemory};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ancestor ids of a carnivore, including its own
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage(BTreeSet<OrganismId>);

impl Lineage {
    /// Lineage founded by a single organism
    pub fn founded(id: OrganismId) -> Self {
        Self(BTreeSet::from([id]))
    }

    /// Parent lineage extended with a child id
    pub fn descend(&self, child: OrganismId) -> Self {
        let mut ids = self.0.clone();
        ids.insert(child);
        Self(ids)
    }

    /// Founding ancestor (ids only ever grow along a lineage)
    pub fn root(&self) -> Option<OrganismId> {
        self.0.first().copied()
    }

    #[inline]
    pub fn contains(&self, id: OrganismId) -> bool {
        self.0.contains(&id)
    }

    /// Whether any id is already in `known`
    pub fn intersects(&self, known: &BTreeSet<OrganismId>) -> bool {
        self.0.iter().any(|id| known.contains(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = OrganismId> + '_ {
        self.0.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a carnivore prefers to hunt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HuntingStrategy {
    Ambush,
    Pursuit,
}

/// Herbivore state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Herbivore {
    pub speed: f64,
    pub food_gene: f64,
    /// Base Manhattan range for spotting carnivores
    pub carnivore_detection: f64,
    /// Memory trait in [0, 1]; controls forgetting
    pub memory: f64,
    pub energy_efficiency: f64,
    pub fear: f64,
    pub known_carnivores: BTreeSet<OrganismId>,
    /// Chance of recognising an unknown carnivore
    pub carnivore_sense: f64,
    pub spatial_memory: SpatialMemory,
}

impl Herbivore {
    /// Express a genome; returns the state and the lifespan in frames
    pub fn express(genome: &Genome, config: &Config, carnivore_sense: f64) -> (Self, u32) {
        let ranges = &config.genetics.herbivore;
        let memory_share = genome.expressed(ht::MEMORY);
        let capacity = ranges.memory_capacity.express(memory_share) as usize;
        let herbivore = Self {
            speed: ranges.speed.express(genome.expressed(ht::SPEED)),
            food_gene: ranges.food_gene.express(genome.expressed(ht::FOOD_GENE)),
            carnivore_detection: ranges
                .carnivore_detection
                .express(genome.expressed(ht::CARNIVORE_DETECTION)),
            memory: ranges.memory.express(memory_share).min(1.0),
            energy_efficiency: ranges
                .energy_efficiency
                .express(genome.expressed(ht::ENERGY_EFFICIENCY)),
            fear: config.fear.initial_fear,
            known_carnivores: BTreeSet::new(),
            carnivore_sense: carnivore_sense.clamp(0.0, 1.0),
            spatial_memory: SpatialMemory::new(capacity),
        };
        let lifespan = ranges.lifespan.express(genome.expressed(ht::LIFESPAN)) as u32;
        (herbivore, lifespan)
    }

    /// Emotional context for memory encoding and recall
    pub fn context(&self) -> MemoryContext {
        MemoryContext::new(self.fear, self.known_carnivores.len())
    }

    /// Add fear, capped at 1
    #[inline]
    pub fn add_fear(&mut self, amount: f64) {
        self.fear = (self.fear + amount).clamp(0.0, 1.0);
    }

    /// Absorb fear transferred by a neighbour, with diminishing effect
    pub fn receive_fear(&mut self, transfer: f64, memory_gain: f64) {
        self.fear = (self.fear + transfer * (1.0 - self.fear)).clamp(0.0, 1.0);
        self.memory = (self.memory + memory_gain * transfer).min(1.0);
    }

    /// Learn a set of carnivore ids; returns true if anything was new
    pub fn learn<I: IntoIterator<Item = OrganismId>>(&mut self, ids: I) -> bool {
        let before = self.known_carnivores.len();
        self.known_carnivores.extend(ids);
        self.known_carnivores.len() > before
    }

    pub(crate) fn advance<R: Rng + ?Sized>(
        &mut self,
        pos: &mut Position,
        ctx: &FrameContext<'_>,
        rng: &mut R,
    ) -> Behavior {
        let cfg = ctx.config;
        self.spatial_memory.decay(
            ctx.frame,
            decay_exponent(self.memory, &cfg.memory),
            cfg.memory.purge_threshold,
        );
        self.fear = (self.fear - cfg.fear.decay_per_frame).max(0.0);

        if let Some((threat, distance)) = self.detect(*pos, ctx.peers, cfg, rng) {
            self.flee(pos, threat, distance, ctx, rng);
            return Behavior::Fleeing;
        }

        let detection = if ctx.food.is_empty() { 0.0 } else { self.food_gene };
        if detection > 0.0 {
            self.forage(pos, ctx, rng)
        } else {
            random_step(pos, self.speed, ctx.grid_size, rng);
            Behavior::Wandering
        }
    }

    /// Nearest recognised carnivore within the fear-widened range
    fn detect<R: Rng + ?Sized>(
        &mut self,
        pos: Position,
        peers: &[PeerView],
        config: &Config,
        rng: &mut R,
    ) -> Option<(Position, u32)> {
        let range = self.carnivore_detection * (1.0 + config.fear.detection_fear_gain * self.fear);
        let mut nearest: Option<(Position, u32)> = None;

        for peer in peers.iter().filter(|p| p.role == Role::Carnivore) {
            let Some(lineage) = &peer.lineage else { continue };
            if !lineage.intersects(&self.known_carnivores) {
                if rng.gen::<f64>() >= self.carnivore_sense {
                    continue;
                }
                self.learn(lineage.ids());
            }

            let distance = pos.manhattan(peer.position);
            if distance as f64 <= range && nearest.map_or(true, |(_, d)| distance < d) {
                nearest = Some((peer.position, distance));
            }
        }

        nearest
    }

    fn flee<R: Rng + ?Sized>(
        &mut self,
        pos: &mut Position,
        threat: Position,
        distance: u32,
        ctx: &FrameContext<'_>,
        rng: &mut R,
    ) {
        let fear_cfg = &ctx.config.fear;
        let increase = fear_cfg.flee_fear_peak
            / (1.0 + (-fear_cfg.flee_fear_slope * (distance as f64 - fear_cfg.flee_fear_midpoint)).exp());
        self.add_fear(increase);
        self.energy_efficiency =
            (self.energy_efficiency - fear_cfg.efficiency_cost * increase).max(fear_cfg.efficiency_floor);

        let flee_speed =
            self.speed * (1.0 + fear_cfg.flee_speed_boost * self.fear.powf(fear_cfg.flee_speed_exponent));
        if rng.gen::<f64>() < flee_speed {
            step_away(pos, threat, ctx.grid_size, rng);
        }
    }

    fn forage<R: Rng + ?Sized>(&mut self, pos: &mut Position, ctx: &FrameContext<'_>, rng: &mut R) -> Behavior {
        let context = self.context();
        let recalled = self
            .spatial_memory
            .retrieve(&context, &ctx.config.memory, rng)
            .filter(|p| ctx.food.is_present(*p));

        let Some(target) = recalled.or_else(|| ctx.food.nearest(*pos)) else {
            random_step(pos, self.speed, ctx.grid_size, rng);
            return Behavior::Wandering;
        };
        self.spatial_memory.remember(target, context, ctx.frame);

        if rng.gen::<f64>() < self.food_gene {
            step_toward(pos, target, ctx.grid_size, rng);
            Behavior::Foraging
        } else {
            random_step(pos, self.speed, ctx.grid_size, rng);
            Behavior::Wandering
        }
    }
}

/// Carnivore state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Carnivore {
    pub speed: f64,
    pub food_gene: f64,
    pub stealth: f64,
    pub energy_efficiency: f64,
    pub lineage: Lineage,
    pub hunting_strategy: HuntingStrategy,
    /// Frames left resting after a kill
    pub rest_timer: u32,
}

impl Carnivore {
    /// Express a genome; returns the state and the lifespan in frames
    pub fn express<R: Rng + ?Sized>(genome: &Genome, config: &Config, lineage: Lineage, rng: &mut R) -> (Self, u32) {
        let ranges = &config.genetics.carnivore;
        let speed = ranges.speed.express(genome.expressed(ct::SPEED));
        let stealth = ranges.stealth.express(genome.expressed(ct::STEALTH));
        let hunting_strategy = match WeightedIndex::new([stealth, speed]).map(|dist| dist.sample(rng)) {
            Ok(0) => HuntingStrategy::Ambush,
            _ => HuntingStrategy::Pursuit,
        };
        let carnivore = Self {
            speed,
            food_gene: ranges.food_gene.express(genome.expressed(ct::FOOD_GENE)),
            stealth,
            energy_efficiency: ranges
                .energy_efficiency
                .express(genome.expressed(ct::ENERGY_EFFICIENCY)),
            lineage,
            hunting_strategy,
            rest_timer: 0,
        };
        let lifespan = ranges.lifespan.express(genome.expressed(ct::LIFESPAN)) as u32;
        (carnivore, lifespan)
    }

    #[inline]
    pub fn is_resting(&self) -> bool {
        self.rest_timer > 0
    }

    pub(crate) fn advance<R: Rng + ?Sized>(
        &mut self,
        pos: &mut Position,
        ctx: &FrameContext<'_>,
        rng: &mut R,
    ) -> Behavior {
        if self.rest_timer > 0 {
            self.rest_timer -= 1;
            return Behavior::Resting;
        }

        let prey = ctx
            .peers
            .iter()
            .filter(|p| p.role == Role::Herbivore)
            .min_by_key(|p| p.position.manhattan(*pos))
            .map(|p| p.position);

        match prey {
            Some(target) if rng.gen::<f64>() < self.food_gene => {
                step_toward(pos, target, ctx.grid_size, rng);
                Behavior::Hunting
            }
            _ => {
                random_step(pos, self.speed, ctx.grid_size, rng);
                Behavior::Wandering
            }
        }
    }
}

/// Founder carnivore-sense draw
pub(crate) fn founder_sense<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> f64 {
    gaussian(rng, config.fear.sense_mean, config.fear.sense_sd).clamp(0.0, 1.0)
}

/// Offspring carnivore-sense draw around the parent's value
pub(crate) fn inherited_sense<R: Rng + ?Sized>(parent: f64, config: &Config, rng: &mut R) -> f64 {
    gaussian(rng, parent, config.fear.sense_inherit_sd).clamp(0.0, 1.0)
}
