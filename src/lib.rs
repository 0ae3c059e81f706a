//! # ECOTONE
//!
//! Grid-based predator-prey ecosystem simulator with heritable trait
//! tradeoffs, spatial memory and fear propagation.
//!
//! ## Features
//!
//! - **Constrained genetics**: softmax trait budgets with species tradeoffs
//! - **Spatial memory**: decaying, context-weighted recall of food sites
//! - **Fear network**: threat knowledge spreads through the herd
//! - **Food events**: droughts and abundance change respawn pressure
//! - **Reproducible**: every random draw comes from one injectable RNG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecotone::{World, Config};
//!
//! // Create world with default config
//! let config = Config::default();
//! let mut world = World::new_with_seed(config, 42);
//!
//! // Run simulation
//! world.run(1000);
//!
//! // Check results
//! println!("Herbivores: {}", world.herbivore_count());
//! println!("Carnivores: {}", world.carnivore_count());
//! ```
//!
//! ## Driving frames directly
//!
//! ```rust
//! use ecotone::{Config, World};
//! use ecotone::events::FoodEvent;
//!
//! let mut world = World::new_with_seed(Config::default(), 7);
//! world.force_food_event(FoodEvent::Drought, 250);
//! for frame in 0..10 {
//!     let snapshot = world.update(frame);
//!     assert!(snapshot.food.len() <= 100);
//! }
//! println!("{}", world.get_stats(10).summary());
//! ```

pub mod config;
pub mod events;
pub mod fear;
pub mod genetics;
pub mod grid;
pub mod memory;
pub mod organism;
pub mod stats;
pub mod world;

// Re-export main types
pub use config::Config;
pub use organism::{Organism, Role};
pub use stats::Stats;
pub use world::{Snapshot, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(frames: u64, herbivores: usize, carnivores: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.world.initial_herbivores = herbivores;
    config.world.initial_carnivores = carnivores;

    let mut world = World::new_with_seed(config, 0);
    let initial_population = world.population();

    let start = Instant::now();
    world.run(frames);
    let elapsed = start.elapsed();

    BenchmarkResult {
        frames,
        initial_population,
        final_population: world.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        frames_per_second: frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        max_generation: world.stats.generation_max,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub frames: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub frames_per_second: f64,
    pub max_generation: u32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Frames: {}", self.frames)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} frames/s", self.frames_per_second)?;
        writeln!(f, "Max generation: {}", self.max_generation)?;
        Ok(())
    }
}
