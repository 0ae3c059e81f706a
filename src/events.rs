//! Food event system - drought and abundance regimes.

use crate::config::{EventProfile, FoodEventConfig};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Global food regime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodEvent {
    #[default]
    Normal,
    Drought,
    Abundance,
}

impl FoodEvent {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            FoodEvent::Normal => "normal",
            FoodEvent::Drought => "drought",
            FoodEvent::Abundance => "abundance",
        }
    }
}

impl std::fmt::Display for FoodEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A regime change reported by [`FoodEventSystem::advance`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTransition {
    Started { event: FoodEvent, duration: u64 },
    Ended,
}

/// Food event state machine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodEventSystem {
    pub current: FoodEvent,
    /// Frames left in the current event (0 when idle)
    pub remaining: u64,
    /// Respawn delay in effect
    pub respawn_delay: u64,
    /// Target number of stocked food sites
    pub target_food: usize,
    base_respawn_delay: u64,
    base_food: usize,
}

impl FoodEventSystem {
    pub fn new(config: &FoodEventConfig, base_food: usize) -> Self {
        Self {
            current: FoodEvent::Normal,
            remaining: 0,
            respawn_delay: config.base_respawn_delay,
            target_food: base_food,
            base_respawn_delay: config.base_respawn_delay,
            base_food,
        }
    }

    /// Advance one frame: maybe start an event, then count the running one down
    pub fn advance<R: Rng + ?Sized>(&mut self, config: &FoodEventConfig, rng: &mut R) -> Option<EventTransition> {
        let mut transition = None;

        if self.remaining == 0 && rng.gen::<f64>() < config.trigger_probability {
            let event = Self::pick(config, rng);
            let profile = Self::profile(config, event);
            let duration = rng.gen_range(profile.min_duration..=profile.max_duration.max(profile.min_duration));
            self.start(event, duration, config);
            log::info!("Food event triggered: {} for {} frames", event, duration);
            transition = Some(EventTransition::Started { event, duration });
        }

        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.reset();
                log::info!("Food event ended, returning to normal");
                transition = Some(EventTransition::Ended);
            }
        }

        transition
    }

    /// Start an event directly with the given duration.
    /// A zero duration leaves the system at the baseline.
    pub fn force(&mut self, event: FoodEvent, duration: u64, config: &FoodEventConfig) {
        self.start(event, duration, config);
    }

    fn start(&mut self, event: FoodEvent, duration: u64, config: &FoodEventConfig) {
        if duration == 0 {
            self.remaining = 0;
            self.reset();
            return;
        }
        self.current = event;
        self.remaining = duration;
        self.respawn_delay = self.delay_for(event, config);
        self.target_food = self.food_for(event, config);
    }

    fn reset(&mut self) {
        self.current = FoodEvent::Normal;
        self.respawn_delay = self.base_respawn_delay;
        self.target_food = self.base_food;
    }

    /// Respawn delay an event imposes
    pub fn delay_for(&self, event: FoodEvent, config: &FoodEventConfig) -> u64 {
        match event {
            FoodEvent::Normal => self.base_respawn_delay,
            _ => (self.base_respawn_delay as f64 * Self::profile(config, event).delay_factor) as u64,
        }
    }

    /// Target food count an event imposes
    pub fn food_for(&self, event: FoodEvent, config: &FoodEventConfig) -> usize {
        let scaled = (self.base_food as f64 * Self::profile(config, event).food_factor) as usize;
        match event {
            FoodEvent::Normal => self.base_food,
            FoodEvent::Drought => scaled.max(config.drought_min_food),
            FoodEvent::Abundance => scaled,
        }
    }

    /// Whether an event other than the idle baseline is running
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    fn pick<R: Rng + ?Sized>(config: &FoodEventConfig, rng: &mut R) -> FoodEvent {
        const EVENTS: [FoodEvent; 3] = [FoodEvent::Drought, FoodEvent::Abundance, FoodEvent::Normal];
        let weights = [config.drought.weight, config.abundance.weight, config.normal.weight];
        match WeightedIndex::new(weights) {
            Ok(dist) => EVENTS[dist.sample(rng)],
            Err(_) => FoodEvent::Normal,
        }
    }

    fn profile(config: &FoodEventConfig, event: FoodEvent) -> &EventProfile {
        match event {
            FoodEvent::Normal => &config.normal,
            FoodEvent::Drought => &config.drought,
            FoodEvent::Abundance => &config.abundance,
        }
    }
}
