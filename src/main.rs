//! ECOTONE - CLI Entry Point
//!
//! Predator-prey ecosystem simulator.

use clap::{Parser, Subcommand};
use ecotone::{benchmark, Config, Stats, World};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ecotone")]
#[command(version)]
#[command(about = "Predator-prey ecosystem simulator with trait tradeoffs and fear propagation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "5000")]
        frames: u64,

        /// Output directory for the stats history
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of frames
        #[arg(short, long, default_value = "1000")]
        frames: u64,

        /// Initial herbivores
        #[arg(long, default_value = "50")]
        herbivores: usize,

        /// Initial carnivores
        #[arg(long, default_value = "5")]
        carnivores: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Run independent seeds in parallel and compare outcomes
    Replicates {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of replicate worlds
        #[arg(short = 'n', long, default_value = "8")]
        count: u64,

        /// Frames per replicate
        #[arg(short, long, default_value = "5000")]
        frames: u64,

        /// Seed of the first replicate; the rest count up from it
        #[arg(long, default_value = "0")]
        base_seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            frames,
            output,
            seed,
            quiet,
        } => run_simulation(config, frames, output, seed, quiet),

        Commands::Benchmark {
            frames,
            herbivores,
            carnivores,
        } => run_benchmark(frames, herbivores, carnivores),

        Commands::Init { output } => generate_config(output),

        Commands::Replicates {
            config,
            count,
            frames,
            base_seed,
        } => run_replicates(config, count, frames, base_seed),
    }
}

/// Initialize logging with a default filter; RUST_LOG still wins
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Ok(Config::from_file(path)?)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

fn run_simulation(
    config_path: PathBuf,
    frames: u64,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    init_logging(&config.logging.log_level);

    // Create output directory
    std::fs::create_dir_all(&output)?;

    // Create world
    let mut world = if let Some(s) = seed {
        println!("Using seed: {}", s);
        World::new_with_seed(config.clone(), s)
    } else {
        World::new(config.clone())
    };

    println!("Starting simulation");
    println!(
        "  Initial population: {} herbivores, {} carnivores",
        world.herbivore_count(),
        world.carnivore_count()
    );
    println!("  Grid size: {}x{}", config.world.grid_size, config.world.grid_size);
    println!("  Frames: {}", frames);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;

    for i in 0..frames {
        world.step();

        // Stats output
        if !quiet && i % stats_interval == 0 {
            println!("{}", world.stats.summary());
        }

        // Check for extinction
        if world.is_extinct() {
            println!("\nPopulation extinct at frame {}", i);
            break;
        }
    }

    let elapsed = start.elapsed();
    let frames_per_sec = world.time as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Frames: {}", world.time);
    println!("Speed: {:.1} frames/s", frames_per_sec);
    println!("{}", world.get_stats(world.time).summary());
    println!("Carnivore lineages: {}", world.stats.carnivore_lineages);

    // Save stats history
    let stats_path = output.join("stats_history.json");
    world.stats_history.save(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);

    Ok(())
}

fn run_benchmark(frames: u64, herbivores: usize, carnivores: usize) -> Result<(), Box<dyn std::error::Error>> {
    init_logging("warn");

    println!("=== ECOTONE Benchmark ===");
    println!("Frames: {}", frames);
    println!("Population: {} herbivores, {} carnivores", herbivores, carnivores);
    println!();

    let result = benchmark(frames, herbivores, carnivores);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn run_replicates(
    config_path: PathBuf,
    count: u64,
    frames: u64,
    base_seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    init_logging("warn");

    println!("Running {} replicates of {} frames", count, frames);
    let start = Instant::now();

    let results: Vec<(u64, Stats)> = (0..count)
        .into_par_iter()
        .map(|i| {
            let seed = base_seed + i;
            let mut world = World::new_with_seed(config.clone(), seed);
            world.run(frames);
            (seed, world.get_stats(frames))
        })
        .collect();

    println!();
    println!("=== Replicates ({:.2}s) ===", start.elapsed().as_secs_f64());
    for (seed, stats) in &results {
        println!("seed {:6} | {}", seed, stats.summary());
    }

    let coexisting = results
        .iter()
        .filter(|(_, s)| s.herbivores > 0 && s.carnivores > 0)
        .count();
    let extinct = results.iter().filter(|(_, s)| s.population() == 0).count();
    println!();
    println!("Coexisting: {}/{}", coexisting, results.len());
    println!("Extinct: {}/{}", extinct, results.len());

    Ok(())
}
