//! Genetics - trait vectors, tradeoff constraints and constrained allocation.
//!
//! An organism's heritable traits are a budget split across capabilities:
//! a softmax-normalised [`TraitVector`] whose shares sum to one. The
//! [`TraitAllocator`] samples and mutates these vectors while keeping two
//! competing shares inside a species-specific [`Tradeoff`].

pub mod allocator;
pub mod tradeoff;

pub use allocator::{Allocation, TraitAllocator};
pub use tradeoff::Tradeoff;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of herbivore traits
pub const HERBIVORE_TRAITS: usize = 6;

/// Number of carnivore traits
pub const CARNIVORE_TRAITS: usize = 5;

/// Herbivore trait layout
pub mod herbivore {
    pub const LIFESPAN: usize = 0;
    pub const SPEED: usize = 1;
    pub const FOOD_GENE: usize = 2;
    pub const CARNIVORE_DETECTION: usize = 3;
    pub const MEMORY: usize = 4;
    pub const ENERGY_EFFICIENCY: usize = 5;
}

/// Carnivore trait layout
pub mod carnivore {
    pub const LIFESPAN: usize = 0;
    pub const SPEED: usize = 1;
    pub const STEALTH: usize = 2;
    pub const ENERGY_EFFICIENCY: usize = 3;
    pub const FOOD_GENE: usize = 4;
}

/// Softmax-normalised allocation of the trait budget
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitVector(Vec<f64>);

impl TraitVector {
    /// Normalise raw component values with a softmax
    pub fn from_raw(raw: &[f64]) -> Self {
        Self(softmax(raw))
    }

    /// Uniform allocation over `len` traits
    pub fn uniform(len: usize) -> Self {
        Self(vec![1.0 / len.max(1) as f64; len])
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Heritable genotype: trait shares plus the generation that produced them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub shares: TraitVector,
    pub generation: u32,
    /// Fixed expression level used by early-generation founders
    pub baseline: Option<f64>,
}

impl Genome {
    /// Share expressed for a trait (the baseline overrides the vector)
    #[inline]
    pub fn expressed(&self, index: usize) -> f64 {
        match self.baseline {
            Some(level) => level,
            None => self.shares.get(index),
        }
    }

    /// Expressed value of every trait, in layout order
    pub fn expressed_vector(&self) -> Vec<f64> {
        (0..self.shares.len()).map(|i| self.expressed(i)).collect()
    }
}

/// Numerically stable softmax
pub fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw.iter().map(|&v| (v - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Gaussian sample via the Box-Muller transform
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    mean + sd * z
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_softmax_sums_to_one() {
        let shares = softmax(&[0.2, 0.5, 0.1, 3.0]);
        assert!((shares.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(shares.iter().all(|&s| s > 0.0));
        assert!(shares[3] > shares[1]);
    }

    #[test]
    fn test_softmax_of_constant_is_uniform() {
        let shares = softmax(&[0.13; 6]);
        for s in shares {
            assert!((s - 1.0 / 6.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(&mut rng, 0.5, 0.1)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01);
        assert!((var.sqrt() - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_genome_baseline_overrides_shares() {
        let genome = Genome {
            shares: TraitVector::uniform(5),
            generation: 2,
            baseline: Some(0.21),
        };
        assert_eq!(genome.expressed(0), 0.21);
        assert_eq!(genome.expressed_vector(), vec![0.21; 5]);
        assert!((genome.shares.sum() - 1.0).abs() < 1e-12);
    }
}
