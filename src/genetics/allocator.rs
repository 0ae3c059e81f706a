//! Constrained trait allocation for founders and offspring.

use super::{gaussian, Genome, TraitVector, Tradeoff};
use crate::config::GeneticsConfig;
use crate::organism::Role;
use rand::Rng;

/// Result of a trait allocation
#[derive(Clone, Debug)]
pub struct Allocation {
    pub genome: Genome,
    /// Samples drawn (0 for the fixed baseline)
    pub attempts: u32,
    /// False when the retry cap was hit and the last sample was kept
    pub satisfied: bool,
}

/// Produces trait vectors that respect the species tradeoff
#[derive(Clone, Debug)]
pub struct TraitAllocator {
    config: GeneticsConfig,
}

impl TraitAllocator {
    pub fn new(config: &GeneticsConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Trait vector for an organism without a parent.
    ///
    /// Early generations get the generation-scaled baseline; later ones
    /// sample around the species means.
    pub fn founder<R: Rng + ?Sized>(&self, role: Role, generation: u32, rng: &mut R) -> Allocation {
        if generation < self.config.early_generation_cutoff {
            return self.baseline(role, generation);
        }

        let means = self.means(role).to_vec();
        let sd = self.config.founder_sd;
        self.sample(role, generation, rng, |rng| {
            means.iter().map(|&m| gaussian(rng, m, sd).abs()).collect()
        })
    }

    /// Mutated copy of a parent's trait vector
    pub fn inherit<R: Rng + ?Sized>(&self, role: Role, parent: &Genome, rng: &mut R) -> Allocation {
        let generation = parent.generation + 1;
        let parent_values = parent.expressed_vector();
        if parent_values.len() != role.trait_count() {
            return self.founder(role, generation, rng);
        }

        let sd = self.config.mutation_sd;
        let floor = self.config.share_floor;
        self.sample(role, generation, rng, |rng| {
            parent_values
                .iter()
                .map(|&v| (v + gaussian(rng, 0.0, sd)).max(floor))
                .collect()
        })
    }

    /// Fixed low allocation for early generations
    pub fn baseline(&self, role: Role, generation: u32) -> Allocation {
        let level = self.config.baseline_base + self.config.baseline_step * generation as f64;
        Allocation {
            genome: Genome {
                shares: TraitVector::from_raw(&vec![level; role.trait_count()]),
                generation,
                baseline: Some(level),
            },
            attempts: 0,
            satisfied: true,
        }
    }

    fn means(&self, role: Role) -> &[f64] {
        match role {
            Role::Herbivore => &self.config.herbivore_means,
            Role::Carnivore => &self.config.carnivore_means,
        }
    }

    fn sample<R, F>(&self, role: Role, generation: u32, rng: &mut R, mut draw: F) -> Allocation
    where
        R: Rng + ?Sized,
        F: FnMut(&mut R) -> Vec<f64>,
    {
        let tradeoff = Tradeoff::for_role(role, &self.config);
        let (a, b) = role.constrained_pair();
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempts = 0;
        loop {
            attempts += 1;
            let shares = TraitVector::from_raw(&draw(rng));
            let satisfied = tradeoff.holds(shares.get(a), shares.get(b));

            if satisfied || attempts >= max_attempts {
                if !satisfied {
                    log::warn!(
                        "{:?} trait allocation missed its tradeoff after {} attempts; keeping last sample",
                        role,
                        attempts
                    );
                }
                return Allocation {
                    genome: Genome {
                        shares,
                        generation,
                        baseline: None,
                    },
                    attempts,
                    satisfied,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn allocator() -> TraitAllocator {
        TraitAllocator::new(&GeneticsConfig::default())
    }

    fn assert_valid(genome: &Genome, len: usize) {
        assert_eq!(genome.shares.len(), len);
        assert!(genome.shares.as_slice().iter().all(|&s| s >= 0.0));
        assert!((genome.shares.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_early_generation_baseline() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let alloc = allocator().founder(Role::Herbivore, 2, &mut rng);

        assert_eq!(alloc.attempts, 0);
        assert!(alloc.satisfied);
        assert_eq!(alloc.genome.baseline, Some(0.13 + 0.04 * 2.0));
        assert_valid(&alloc.genome, 6);
        assert!((alloc.genome.expressed(0) - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_founder_sampling_respects_tradeoff() {
        let allocator = allocator();
        let config = GeneticsConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for role in [Role::Herbivore, Role::Carnivore] {
            let tradeoff = Tradeoff::for_role(role, &config);
            let (a, b) = role.constrained_pair();
            for _ in 0..200 {
                let alloc = allocator.founder(role, 8, &mut rng);
                assert!(alloc.satisfied);
                assert!(alloc.genome.baseline.is_none());
                assert_valid(&alloc.genome, role.trait_count());
                assert!(tradeoff.holds(alloc.genome.shares.get(a), alloc.genome.shares.get(b)));
            }
        }
    }

    #[test]
    fn test_inherit_mutates_parent() {
        let allocator = allocator();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let parent = allocator.founder(Role::Carnivore, 0, &mut rng).genome;

        let child = allocator.inherit(Role::Carnivore, &parent, &mut rng);
        assert!(child.satisfied);
        assert_eq!(child.genome.generation, 1);
        assert!(child.genome.baseline.is_none());
        assert_valid(&child.genome, 5);
        assert_ne!(child.genome.shares, parent.shares);
    }

    #[test]
    fn test_inherit_across_species_falls_back_to_founder() {
        let allocator = allocator();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let parent = allocator.founder(Role::Herbivore, 6, &mut rng).genome;

        let child = allocator.inherit(Role::Carnivore, &parent, &mut rng);
        assert_eq!(child.genome.shares.len(), 5);
        assert_eq!(child.genome.generation, 7);
    }

    #[test]
    fn test_unsatisfiable_tradeoff_falls_back() {
        let mut config = GeneticsConfig::default();
        // x^0.05 is close to 1 for any share, so no pair can fit the budget
        config.herbivore_tradeoff = 0.05;
        config.max_attempts = 25;
        let allocator = TraitAllocator::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let alloc = allocator.founder(Role::Herbivore, 10, &mut rng);
        assert!(!alloc.satisfied);
        assert_eq!(alloc.attempts, 25);
        assert_valid(&alloc.genome, 6);
    }
}
