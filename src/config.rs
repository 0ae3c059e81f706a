//! Configuration system for the ecotone simulation.
//!
//! Supports YAML configuration files with defaults matching the canonical
//! scenario (50x50 grid, five founder herbivores, 100 food sites).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub predation: PredationConfig,
    #[serde(default)]
    pub food_events: FoodEventConfig,
    #[serde(default)]
    pub fear: FearConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub genetics: GeneticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// World/environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Size of the square grid
    pub grid_size: usize,
    /// Herbivores stocked at start
    pub initial_herbivores: usize,
    /// Carnivores stocked at start
    pub initial_carnivores: usize,
    /// Baseline number of food sites
    pub initial_food: usize,
    /// Seed for the fixed initial food layout
    pub food_seed: u64,
    /// Age accrued per frame before the fear multiplier
    pub movement_cost: f64,
}

/// Division thresholds and cross-species mutation rates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Frames a herbivore must wait after touching food before dividing
    pub herbivore_touch_frames: u64,
    /// Chance that a kill triggers carnivore division
    pub carnivore_division_probability: f64,
    /// Chance a herbivore offspring is born carnivore while none exist
    pub carnivore_emergence_rate: f64,
    /// Same chance once carnivores are established
    pub carnivore_emergence_rate_established: f64,
}

/// Predation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredationConfig {
    /// Frames without a kill before a carnivore starves
    pub starvation_time: u64,
    /// Rest frames after a kill
    pub rest_cooldown: u32,
    /// Manhattan radius in which herbivores witness a kill
    pub visibility_radius: u32,
    /// Fear added to each witness
    pub witness_fear: f64,
}

/// Shape of one non-normal food regime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventProfile {
    /// Selection weight when an event fires
    pub weight: f64,
    pub min_duration: u64,
    pub max_duration: u64,
    /// Multiplier on the base respawn delay
    pub delay_factor: f64,
    /// Multiplier on the base food count
    pub food_factor: f64,
}

/// Food event state machine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodEventConfig {
    /// Frames before an eaten site respawns under normal conditions
    pub base_respawn_delay: u64,
    /// Per-frame chance of a new event while none is running
    pub trigger_probability: f64,
    pub drought: EventProfile,
    pub abundance: EventProfile,
    pub normal: EventProfile,
    /// Floor for the drought target food count
    pub drought_min_food: usize,
    /// Random draws per missing food site, multiplied by grid size
    pub top_up_retry_factor: usize,
}

/// Fear dynamics and communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearConfig {
    /// Fear of a newborn herbivore
    pub initial_fear: f64,
    /// Fear lost per frame
    pub decay_per_frame: f64,
    /// Base communication radius (Manhattan)
    pub communication_radius: f64,
    /// Radius growth per unit of sender fear
    pub radius_fear_gain: f64,
    /// Fear transferred at zero distance
    pub transfer_strength: f64,
    /// Memory trait gain per unit of transferred fear
    pub memory_gain: f64,
    /// Detection range growth per unit of fear
    pub detection_fear_gain: f64,
    /// Sigmoid peak of the flee fear increase
    pub flee_fear_peak: f64,
    pub flee_fear_slope: f64,
    pub flee_fear_midpoint: f64,
    /// Speed multiplier while fleeing at full fear
    pub flee_speed_boost: f64,
    pub flee_speed_exponent: f64,
    /// Energy efficiency lost per unit of fear gained
    pub efficiency_cost: f64,
    pub efficiency_floor: f64,
    /// Founder carnivore-sense distribution
    pub sense_mean: f64,
    pub sense_sd: f64,
    /// Offspring carnivore-sense spread around the parent
    pub sense_inherit_sd: f64,
}

/// Spatial memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Entries at or below this strength are purged
    pub purge_threshold: f64,
    /// Decay exponent for a memory trait of 1.0
    pub base_decay: f64,
    /// Extra decay exponent for a memory trait of 0.0
    pub decay_span: f64,
    /// Context similarity weight on fear
    pub fear_weight: f64,
    /// Context similarity weight on known threat count
    pub threat_weight: f64,
}

/// Linear mapping from a trait share to a domain value
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraitRange {
    pub min: f64,
    pub span: f64,
}

impl TraitRange {
    pub const fn new(min: f64, span: f64) -> Self {
        Self { min, span }
    }

    /// Express a share in this range
    #[inline]
    pub fn express(&self, share: f64) -> f64 {
        self.min + self.span * share.max(0.0)
    }
}

/// Domain ranges for herbivore traits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HerbivoreRanges {
    pub lifespan: TraitRange,
    pub speed: TraitRange,
    pub food_gene: TraitRange,
    pub carnivore_detection: TraitRange,
    pub memory: TraitRange,
    pub energy_efficiency: TraitRange,
    pub memory_capacity: TraitRange,
}

/// Domain ranges for carnivore traits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarnivoreRanges {
    pub lifespan: TraitRange,
    pub speed: TraitRange,
    pub stealth: TraitRange,
    pub energy_efficiency: TraitRange,
    pub food_gene: TraitRange,
}

/// Trait allocation and mutation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticsConfig {
    /// Generations below this use the fixed baseline
    pub early_generation_cutoff: u32,
    pub baseline_base: f64,
    pub baseline_step: f64,
    /// Spread of founder samples around the species means
    pub founder_sd: f64,
    /// Spread of per-component mutation noise
    pub mutation_sd: f64,
    /// Lower clip applied to perturbed components
    pub share_floor: f64,
    /// Tradeoff sampling attempts before falling back
    pub max_attempts: u32,
    /// Exponent of the herbivore lifespan/speed tradeoff
    pub herbivore_tradeoff: f64,
    /// Exponent of the carnivore speed/stealth tradeoff
    pub carnivore_tradeoff: f64,
    pub herbivore_means: Vec<f64>,
    pub carnivore_means: Vec<f64>,
    pub herbivore: HerbivoreRanges,
    pub carnivore: CarnivoreRanges,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Frames between stats history records
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            reproduction: ReproductionConfig::default(),
            predation: PredationConfig::default(),
            food_events: FoodEventConfig::default(),
            fear: FearConfig::default(),
            memory: MemoryConfig::default(),
            genetics: GeneticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_size: 50,
            initial_herbivores: 5,
            initial_carnivores: 0,
            initial_food: 100,
            food_seed: 42,
            movement_cost: 1.0,
        }
    }
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            herbivore_touch_frames: 5,
            carnivore_division_probability: 0.1,
            carnivore_emergence_rate: 0.1,
            carnivore_emergence_rate_established: 0.002,
        }
    }
}

impl Default for PredationConfig {
    fn default() -> Self {
        Self {
            starvation_time: 150,
            rest_cooldown: 10,
            visibility_radius: 5,
            witness_fear: 0.6,
        }
    }
}

impl Default for FoodEventConfig {
    fn default() -> Self {
        Self {
            base_respawn_delay: 200,
            trigger_probability: 0.01,
            drought: EventProfile {
                weight: 0.2,
                min_duration: 200,
                max_duration: 400,
                delay_factor: 2.5,
                food_factor: 0.4,
            },
            abundance: EventProfile {
                weight: 0.15,
                min_duration: 150,
                max_duration: 300,
                delay_factor: 0.5,
                food_factor: 1.5,
            },
            normal: EventProfile {
                weight: 0.65,
                min_duration: 300,
                max_duration: 600,
                delay_factor: 1.0,
                food_factor: 1.0,
            },
            drought_min_food: 5,
            top_up_retry_factor: 10,
        }
    }
}

impl Default for FearConfig {
    fn default() -> Self {
        Self {
            initial_fear: 0.2,
            decay_per_frame: 0.05,
            communication_radius: 7.0,
            radius_fear_gain: 0.3,
            transfer_strength: 0.4,
            memory_gain: 0.1,
            detection_fear_gain: 0.5,
            flee_fear_peak: 0.8,
            flee_fear_slope: 0.5,
            flee_fear_midpoint: 3.0,
            flee_speed_boost: 2.5,
            flee_speed_exponent: 0.7,
            efficiency_cost: 0.1,
            efficiency_floor: 0.5,
            sense_mean: 0.8,
            sense_sd: 0.2,
            sense_inherit_sd: 0.05,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            purge_threshold: 0.05,
            base_decay: 0.5,
            decay_span: 0.3,
            fear_weight: 0.7,
            threat_weight: 0.3,
        }
    }
}

impl Default for HerbivoreRanges {
    fn default() -> Self {
        Self {
            lifespan: TraitRange::new(500.0, 1500.0),
            speed: TraitRange::new(0.05, 0.85),
            food_gene: TraitRange::new(0.05, 0.45),
            carnivore_detection: TraitRange::new(2.0, 12.0),
            memory: TraitRange::new(0.05, 0.9),
            energy_efficiency: TraitRange::new(0.5, 0.5),
            memory_capacity: TraitRange::new(2.0, 6.0),
        }
    }
}

impl Default for CarnivoreRanges {
    fn default() -> Self {
        Self {
            lifespan: TraitRange::new(600.0, 1200.0),
            speed: TraitRange::new(0.1, 0.8),
            stealth: TraitRange::new(0.05, 0.9),
            energy_efficiency: TraitRange::new(0.5, 0.5),
            food_gene: TraitRange::new(0.05, 0.45),
        }
    }
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            early_generation_cutoff: 5,
            baseline_base: 0.13,
            baseline_step: 0.04,
            founder_sd: 0.07,
            mutation_sd: 0.04,
            share_floor: 0.01,
            max_attempts: 300,
            herbivore_tradeoff: 0.7,
            carnivore_tradeoff: 1.3,
            herbivore_means: vec![0.2, 0.2, 0.2, 0.2, 0.1, 0.1],
            carnivore_means: vec![0.25, 0.25, 0.25, 0.1, 0.15],
            herbivore: HerbivoreRanges::default(),
            carnivore: CarnivoreRanges::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.grid_size == 0 || self.world.grid_size > u16::MAX as usize {
            return Err(ConfigError::Invalid(
                "grid_size must be between 1 and 65535".to_string(),
            ));
        }
        let probabilities = [
            ("reproduction.carnivore_division_probability", self.reproduction.carnivore_division_probability),
            ("reproduction.carnivore_emergence_rate", self.reproduction.carnivore_emergence_rate),
            (
                "reproduction.carnivore_emergence_rate_established",
                self.reproduction.carnivore_emergence_rate_established,
            ),
            ("food_events.trigger_probability", self.food_events.trigger_probability),
            ("fear.initial_fear", self.fear.initial_fear),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be in [0, 1]", name)));
            }
        }
        for (name, profile) in [
            ("drought", &self.food_events.drought),
            ("abundance", &self.food_events.abundance),
            ("normal", &self.food_events.normal),
        ] {
            if profile.min_duration == 0 || profile.min_duration > profile.max_duration {
                return Err(ConfigError::Invalid(format!(
                    "food_events.{} duration range is empty",
                    name
                )));
            }
            if profile.weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "food_events.{} weight must be non-negative",
                    name
                )));
            }
        }
        if self.genetics.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "genetics.max_attempts must be > 0".to_string(),
            ));
        }
        if self.genetics.herbivore_means.len() != crate::genetics::HERBIVORE_TRAITS
            || self.genetics.carnivore_means.len() != crate::genetics::CARNIVORE_TRAITS
        {
            return Err(ConfigError::Invalid(
                "genetics means must match the species trait layouts".to_string(),
            ));
        }
        if self.logging.stats_interval == 0 {
            return Err(ConfigError::Invalid(
                "logging.stats_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur while loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML error: {}", e),
            Self::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.world.grid_size, loaded.world.grid_size);
        assert_eq!(
            config.food_events.drought.max_duration,
            loaded.food_events.drought.max_duration
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "world:\n  grid_size: 20\n  initial_herbivores: 3\n  initial_carnivores: 1\n  initial_food: 10\n  food_seed: 7\n  movement_cost: 1.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.world.grid_size, 20);
        assert_eq!(config.predation.starvation_time, 150);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut config = Config::default();
        config.food_events.trigger_probability = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_duration_rejected() {
        let mut config = Config::default();
        config.food_events.drought.min_duration = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("ecotone_config_{}.yaml", std::process::id()));
        let mut config = Config::default();
        config.world.grid_size = 33;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.world.grid_size, 33);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_trait_range_express() {
        let range = TraitRange::new(500.0, 1500.0);
        assert_eq!(range.express(0.0), 500.0);
        assert_eq!(range.express(1.0), 2000.0);
        assert_eq!(range.express(-0.5), 500.0);
    }
}
