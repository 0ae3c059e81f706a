//! Spatial memory: a small, decaying store of remembered food sites.
//!
//! Each herbivore keeps a handful of entries. Strength follows a power-law
//! forgetting curve and recall is weighted by how closely the current
//! emotional context (fear, number of known threats) matches the context
//! at encoding time. Recall is stochastic: the best entry is returned with
//! probability equal to its score.

use crate::config::MemoryConfig;
use crate::grid::Position;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Emotional context captured when a memory is encoded
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    /// Fear rounded to one decimal
    pub fear: f64,
    /// Number of carnivore ids known at the time
    pub threats_known: usize,
}

impl MemoryContext {
    pub fn new(fear: f64, threats_known: usize) -> Self {
        Self {
            fear: (fear.clamp(0.0, 1.0) * 10.0).round() / 10.0,
            threats_known,
        }
    }

    /// Similarity in [0, 1] between a stored context and the current one
    pub fn similarity(&self, current: &MemoryContext, config: &MemoryConfig) -> f64 {
        let fear_sim = 1.0 - (self.fear - current.fear).abs();
        let threat_gap = (self.threats_known as f64 - current.threats_known as f64).abs();
        let threat_sim = 1.0 - threat_gap / (current.threats_known as f64 + 1.0).max(1.0);
        (config.fear_weight * fear_sim + config.threat_weight * threat_sim).clamp(0.0, 1.0)
    }
}

/// A remembered food location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub position: Position,
    /// Current strength in (0, 1]
    pub strength: f64,
    pub context: MemoryContext,
    /// Frame of the last encoding or refresh
    pub encoded_at: u64,
}

/// Capacity-bounded spatial memory
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpatialMemory {
    capacity: usize,
    entries: Vec<MemoryEntry>,
}

impl SpatialMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Strength of the entry for a position, if stored
    pub fn strength_of(&self, position: Position) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.position == position)
            .map(|e| e.strength)
    }

    /// Store or refresh a food location
    pub fn remember(&mut self, position: Position, context: MemoryContext, now: u64) {
        if self.capacity == 0 {
            return;
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.position == position) {
            entry.strength = 1.0;
            entry.context = context;
            entry.encoded_at = now;
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(weakest) = self.weakest_index() {
                self.entries.swap_remove(weakest);
            }
        }

        self.entries.push(MemoryEntry {
            position,
            strength: 1.0,
            context,
            encoded_at: now,
        });
    }

    /// Recompute strengths from elapsed time and purge faded entries.
    /// Strength never rises between refreshes, even if `alpha` drops.
    pub fn decay(&mut self, now: u64, alpha: f64, purge_threshold: f64) {
        for entry in &mut self.entries {
            let dt = now.saturating_sub(entry.encoded_at).max(1) as f64;
            let curve = (1.0 / (dt + 1.0).powf(alpha)).clamp(0.0, 1.0);
            entry.strength = entry.strength.min(curve);
        }
        self.entries.retain(|e| e.strength > purge_threshold);
    }

    /// Stochastically recall the best-matching location
    pub fn retrieve<R: Rng + ?Sized>(
        &self,
        current: &MemoryContext,
        config: &MemoryConfig,
        rng: &mut R,
    ) -> Option<Position> {
        let mut best: Option<(f64, Position)> = None;
        for entry in &self.entries {
            let score = entry.context.similarity(current, config) * entry.strength;
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, entry.position));
            }
        }

        let (score, position) = best?;
        if rng.gen::<f64>() < score {
            Some(position)
        } else {
            None
        }
    }

    /// Copy for an offspring, keeping the strongest entries that fit
    pub fn inherit(&self, capacity: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries.truncate(capacity);
        Self { capacity, entries }
    }

    fn weakest_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.strength
                    .partial_cmp(&b.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }
}

/// Forgetting exponent for a memory trait; better memory decays slower
pub fn decay_exponent(memory_trait: f64, config: &MemoryConfig) -> f64 {
    (config.base_decay + config.decay_span * (1.0 - memory_trait)).clamp(0.2, 0.8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn calm() -> MemoryContext {
        MemoryContext::new(0.2, 0)
    }

    #[test]
    fn test_remember_refreshes_existing() {
        let mut memory = SpatialMemory::new(3);
        let pos = Position::new(4, 4);
        memory.remember(pos, calm(), 0);
        memory.decay(10, 0.5, 0.05);
        assert!(memory.strength_of(pos).unwrap() < 1.0);

        memory.remember(pos, MemoryContext::new(0.9, 2), 10);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.strength_of(pos), Some(1.0));
        assert_eq!(memory.entries()[0].context.threats_known, 2);
        assert_eq!(memory.entries()[0].encoded_at, 10);
    }

    #[test]
    fn test_capacity_evicts_weakest() {
        let mut memory = SpatialMemory::new(2);
        memory.remember(Position::new(0, 0), calm(), 0);
        memory.remember(Position::new(1, 1), calm(), 8);
        memory.decay(10, 0.5, 0.0);

        memory.remember(Position::new(2, 2), calm(), 10);
        assert_eq!(memory.len(), 2);
        assert!(memory.strength_of(Position::new(0, 0)).is_none());
        assert!(memory.strength_of(Position::new(1, 1)).is_some());
        assert!(memory.strength_of(Position::new(2, 2)).is_some());
    }

    #[test]
    fn test_decay_is_monotone_without_refresh() {
        let mut memory = SpatialMemory::new(4);
        let pos = Position::new(3, 7);
        memory.remember(pos, calm(), 0);

        let mut previous = 1.0;
        for now in 1..30 {
            memory.decay(now, 0.6, 0.0);
            let strength = memory.strength_of(pos).unwrap();
            assert!(strength <= previous);
            previous = strength;
        }
    }

    #[test]
    fn test_decay_holds_when_memory_improves() {
        let config = MemoryConfig::default();
        let mut memory = SpatialMemory::new(2);
        let pos = Position::new(6, 2);
        memory.remember(pos, calm(), 0);

        memory.decay(5, decay_exponent(0.05, &config), 0.0);
        let before = memory.strength_of(pos).unwrap();
        memory.decay(6, decay_exponent(0.8, &config), 0.0);
        let after = memory.strength_of(pos).unwrap();
        assert!(after <= before, "{} > {}", after, before);

        // A refresh still restores full strength
        memory.remember(pos, calm(), 6);
        memory.decay(7, decay_exponent(0.8, &config), 0.0);
        assert!(memory.strength_of(pos).unwrap() > before);
    }

    #[test]
    fn test_decay_purges_faded_entries() {
        let mut memory = SpatialMemory::new(4);
        memory.remember(Position::new(1, 2), calm(), 0);
        memory.decay(1000, 0.8, 0.05);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_decay_exponent_range() {
        let config = MemoryConfig::default();
        assert!((decay_exponent(1.0, &config) - 0.5).abs() < 1e-12);
        assert!((decay_exponent(0.0, &config) - 0.8).abs() < 1e-12);
        assert!(decay_exponent(0.05, &config) > decay_exponent(0.95, &config));
    }

    #[test]
    fn test_retrieve_empty_returns_none() {
        let memory = SpatialMemory::new(3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(memory.retrieve(&calm(), &MemoryConfig::default(), &mut rng).is_none());
    }

    #[test]
    fn test_retrieve_prefers_matching_context() {
        let config = MemoryConfig::default();
        let mut memory = SpatialMemory::new(3);
        memory.remember(Position::new(1, 1), MemoryContext::new(1.0, 5), 0);
        memory.remember(Position::new(9, 9), calm(), 0);

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut hits = 0;
        for _ in 0..200 {
            if let Some(pos) = memory.retrieve(&calm(), &config, &mut rng) {
                assert_eq!(pos, Position::new(9, 9));
                hits += 1;
            }
        }
        // Fresh entry with identical context scores 1.0
        assert_eq!(hits, 200);
    }

    #[test]
    fn test_retrieve_is_stochastic_for_weak_entries() {
        let config = MemoryConfig::default();
        let mut memory = SpatialMemory::new(2);
        memory.remember(Position::new(5, 5), calm(), 0);
        memory.decay(20, 0.8, 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let hits = (0..500)
            .filter(|_| memory.retrieve(&calm(), &config, &mut rng).is_some())
            .count();
        assert!(hits > 0 && hits < 500);
    }

    #[test]
    fn test_context_similarity_bounds() {
        let config = MemoryConfig::default();
        let stored = MemoryContext::new(0.0, 40);
        let current = MemoryContext::new(1.0, 0);
        let sim = stored.similarity(&current, &config);
        assert!((0.0..=1.0).contains(&sim));
        assert_eq!(calm().similarity(&calm(), &config), 1.0);
    }

    #[test]
    fn test_inherit_keeps_strongest() {
        let mut memory = SpatialMemory::new(3);
        memory.remember(Position::new(0, 0), calm(), 0);
        memory.remember(Position::new(1, 0), calm(), 5);
        memory.remember(Position::new(2, 0), calm(), 9);
        memory.decay(10, 0.5, 0.0);

        let child = memory.inherit(1);
        assert_eq!(child.capacity(), 1);
        assert_eq!(child.len(), 1);
        assert_eq!(child.entries()[0].position, Position::new(2, 0));
    }
}
