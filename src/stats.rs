//! Statistics tracking for the simulation.

use crate::events::FoodEvent;
use crate::organism::{Behavior, DeathCause, HuntingStrategy, Organism};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-frame behaviour tallies
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorCounts {
    pub resting: usize,
    pub fleeing: usize,
    pub foraging: usize,
    pub hunting: usize,
    pub wandering: usize,
}

impl BehaviorCounts {
    pub fn record(&mut self, behavior: Behavior) {
        match behavior {
            Behavior::Resting => self.resting += 1,
            Behavior::Fleeing => self.fleeing += 1,
            Behavior::Foraging => self.foraging += 1,
            Behavior::Hunting => self.hunting += 1,
            Behavior::Wandering => self.wandering += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.resting + self.fleeing + self.foraging + self.hunting + self.wandering
    }
}

/// Statistics snapshot for a frame
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    pub frame: u64,
    pub herbivores: usize,
    pub carnivores: usize,
    /// Stocked food sites
    pub food: usize,
    pub event: FoodEvent,
    /// Births committed this frame
    pub births: usize,
    pub deaths_old_age: usize,
    pub deaths_predation: usize,
    pub deaths_starvation: usize,
    /// Maximum generation alive
    pub generation_max: u32,
    /// Distinct carnivore lineages alive
    pub carnivore_lineages: usize,

    // Herbivore trait means (None when no herbivores)
    pub mean_speed_herb: Option<f64>,
    pub mean_lifespan_herb: Option<f64>,
    pub mean_food_gene_herb: Option<f64>,
    pub mean_energy_efficiency_herb: Option<f64>,
    pub mean_memory_herb: Option<f64>,
    pub mean_fear_herb: Option<f64>,

    // Carnivore trait means (None when no carnivores)
    pub mean_speed_carni: Option<f64>,
    pub mean_lifespan_carni: Option<f64>,
    pub mean_food_gene_carni: Option<f64>,
    pub mean_energy_efficiency_carni: Option<f64>,
    pub mean_stealth_carni: Option<f64>,

    pub behaviors: BehaviorCounts,
    pub ambushers: usize,
    pub pursuers: usize,
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update population-derived fields from the current organisms
    pub fn update(&mut self, organisms: &[Organism], food: usize, event: FoodEvent) {
        let herbivores: Vec<&Organism> = organisms.iter().filter(|o| o.is_herbivore()).collect();
        let carnivores: Vec<&Organism> = organisms.iter().filter(|o| o.is_carnivore()).collect();

        self.herbivores = herbivores.len();
        self.carnivores = carnivores.len();
        self.food = food;
        self.event = event;
        self.generation_max = organisms.iter().map(|o| o.generation()).max().unwrap_or(0);

        self.mean_speed_herb = mean(herbivores.iter().map(|o| o.speed()));
        self.mean_lifespan_herb = mean(herbivores.iter().map(|o| o.lifespan as f64));
        self.mean_food_gene_herb = mean(herbivores.iter().map(|o| o.food_gene()));
        self.mean_energy_efficiency_herb = mean(herbivores.iter().map(|o| o.energy_efficiency()));
        self.mean_memory_herb = mean(herbivores.iter().filter_map(|o| o.herbivore_state()).map(|h| h.memory));
        self.mean_fear_herb = mean(herbivores.iter().map(|o| o.fear()));

        self.mean_speed_carni = mean(carnivores.iter().map(|o| o.speed()));
        self.mean_lifespan_carni = mean(carnivores.iter().map(|o| o.lifespan as f64));
        self.mean_food_gene_carni = mean(carnivores.iter().map(|o| o.food_gene()));
        self.mean_energy_efficiency_carni = mean(carnivores.iter().map(|o| o.energy_efficiency()));
        self.mean_stealth_carni = mean(carnivores.iter().filter_map(|o| o.carnivore_state()).map(|c| c.stealth));

        let states: Vec<_> = carnivores.iter().filter_map(|o| o.carnivore_state()).collect();
        self.ambushers = states
            .iter()
            .filter(|c| c.hunting_strategy == HuntingStrategy::Ambush)
            .count();
        self.pursuers = states.len() - self.ambushers;
        self.carnivore_lineages = states
            .iter()
            .filter_map(|c| c.lineage.root())
            .collect::<HashSet<_>>()
            .len();
    }

    /// Count a removal
    pub fn record_death(&mut self, cause: DeathCause) {
        match cause {
            DeathCause::OldAge => self.deaths_old_age += 1,
            DeathCause::Predation => self.deaths_predation += 1,
            DeathCause::Starvation => self.deaths_starvation += 1,
        }
    }

    /// Clear the per-frame counters
    pub fn reset_counters(&mut self) {
        self.births = 0;
        self.deaths_old_age = 0;
        self.deaths_predation = 0;
        self.deaths_starvation = 0;
        self.behaviors = BehaviorCounts::default();
    }

    #[inline]
    pub fn population(&self) -> usize {
        self.herbivores + self.carnivores
    }

    #[inline]
    pub fn deaths(&self) -> usize {
        self.deaths_old_age + self.deaths_predation + self.deaths_starvation
    }

    /// Save stats to JSON file
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "F:{:6} | Herb:{:4} | Carn:{:4} | Food:{:4} | {:9} | B:{:2} D:{}/{}/{} | HSpd:{} Fear:{} | CSpd:{} Stl:{}",
            self.frame,
            self.herbivores,
            self.carnivores,
            self.food,
            self.event.name(),
            self.births,
            self.deaths_old_age,
            self.deaths_predation,
            self.deaths_starvation,
            fmt_opt(self.mean_speed_herb),
            fmt_opt(self.mean_fear_herb),
            fmt_opt(self.mean_speed_carni),
            fmt_opt(self.mean_stealth_carni),
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Get stats at a specific frame (approximate)
    pub fn get_at(&self, frame: u64) -> Option<&Stats> {
        let index = (frame / self.interval.max(1)) as usize;
        self.snapshots.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// (frame, herbivores, carnivores) over time
    pub fn population_series(&self) -> Vec<(u64, usize, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.frame, s.herbivores, s.carnivores))
            .collect()
    }

    /// Stocked food over time
    pub fn food_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.frame, s.food)).collect()
    }

    /// Any trait mean over time, skipping frames where it is undefined
    pub fn trait_series<F>(&self, select: F) -> Vec<(u64, f64)>
    where
        F: Fn(&Stats) -> Option<f64>,
    {
        self.snapshots
            .iter()
            .filter_map(|s| select(s).map(|v| (s.frame, v)))
            .collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
