//! Fear propagation among herbivores.
//!
//! A herbivore that knows carnivore ids shares them, together with a
//! distance-attenuated dose of fear, with every herbivore inside its
//! communication radius. Receivers that learned something new relay in
//! turn. Each herbivore relays at most once per pass, so a pass visits
//! every herbivore at most once.

use crate::config::{Config, FearConfig};
use crate::grid::Position;
use crate::organism::{Lineage, Organism};
use std::collections::{HashSet, VecDeque};

/// Outcome of one propagation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Herbivores that broadcast
    pub relays: usize,
    /// Receivers that learned at least one new id
    pub informed: usize,
    /// Herbivores that saw a kill
    pub witnesses: usize,
}

impl PropagationReport {
    fn absorb(&mut self, other: PropagationReport) {
        self.relays += other.relays;
        self.informed += other.informed;
        self.witnesses += other.witnesses;
    }
}

/// Bounded fear/knowledge propagation
#[derive(Debug, Clone)]
pub struct FearNetwork {
    config: FearConfig,
    visibility_radius: u32,
    witness_fear: f64,
}

impl FearNetwork {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.fear.clone(),
            visibility_radius: config.predation.visibility_radius,
            witness_fear: config.predation.witness_fear,
        }
    }

    /// Communication radius of a sender at a given fear level
    #[inline]
    pub fn radius_for(&self, fear: f64) -> f64 {
        self.config.communication_radius * (1.0 + self.config.radius_fear_gain * fear)
    }

    /// Spread threat knowledge outward from `source`
    pub fn propagate(&self, source: usize, organisms: &mut [Organism]) -> PropagationReport {
        let mut report = PropagationReport::default();
        if !organisms.get(source).map_or(false, |o| o.is_herbivore()) {
            return report;
        }

        let mut visited: HashSet<usize> = HashSet::from([source]);
        let mut queue: VecDeque<usize> = VecDeque::from([source]);

        while let Some(sender) = queue.pop_front() {
            let origin = organisms[sender].position;
            let Some((fear, known)) = organisms[sender]
                .herbivore_state()
                .map(|h| (h.fear, h.known_carnivores.clone()))
            else {
                continue;
            };
            if known.is_empty() {
                continue;
            }

            let radius = self.radius_for(fear);
            if radius <= 0.0 {
                continue;
            }
            report.relays += 1;

            for (idx, receiver) in organisms.iter_mut().enumerate() {
                if idx == sender {
                    continue;
                }
                let distance = receiver.position.manhattan(origin) as f64;
                if distance > radius {
                    continue;
                }
                let Some(h) = receiver.herbivore_state_mut() else {
                    continue;
                };

                if h.learn(known.iter().copied()) {
                    report.informed += 1;
                    if visited.insert(idx) {
                        queue.push_back(idx);
                    }
                }
                let transfer = self.config.transfer_strength * (1.0 - distance / radius);
                h.receive_fear(transfer, self.config.memory_gain);
            }
        }

        report
    }

    /// Herbivores near a kill learn the killer's lineage, take fright and spread it.
    /// Indices in `skip` (already removed this frame) do not react.
    pub fn witness_kill(
        &self,
        organisms: &mut [Organism],
        lineage: &Lineage,
        site: Position,
        skip: &HashSet<usize>,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        let mut witnesses = Vec::new();

        for (idx, org) in organisms.iter_mut().enumerate() {
            if skip.contains(&idx) || org.position.manhattan(site) > self.visibility_radius {
                continue;
            }
            if let Some(h) = org.herbivore_state_mut() {
                h.learn(lineage.ids());
                h.add_fear(self.witness_fear);
                witnesses.push(idx);
            }
        }

        report.witnesses = witnesses.len();
        for idx in witnesses {
            report.absorb(self.propagate(idx, organisms));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::TraitAllocator;
    use crate::organism::Role;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn herd(positions: &[(u16, u16)]) -> (Config, Vec<Organism>) {
        let config = Config::default();
        let allocator = TraitAllocator::new(&config.genetics);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let organisms = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Organism::founder(i as u64, Role::Herbivore, Position::new(x, y), &allocator, &config, &mut rng)
            })
            .collect();
        (config, organisms)
    }

    #[test]
    fn test_silent_sender_does_nothing() {
        let (config, mut organisms) = herd(&[(0, 0), (1, 0)]);
        let network = FearNetwork::new(&config);
        let report = network.propagate(0, &mut organisms);
        assert_eq!(report, PropagationReport::default());
        assert_eq!(organisms[1].fear(), 0.2);
    }

    #[test]
    fn test_knowledge_spreads_through_chain() {
        // 0 -> 1 -> 2 within radius, 3 far away
        let (config, mut organisms) = herd(&[(0, 0), (6, 0), (12, 0), (40, 40)]);
        let network = FearNetwork::new(&config);
        organisms[0].herbivore_state_mut().unwrap().learn([99]);

        let report = network.propagate(0, &mut organisms);
        assert_eq!(report.relays, 3);
        assert_eq!(report.informed, 2);
        for org in &organisms[..3] {
            assert!(org.herbivore_state().unwrap().known_carnivores.contains(&99));
        }
        assert!(organisms[3].herbivore_state().unwrap().known_carnivores.is_empty());
        assert!(organisms[1].fear() > 0.2);
        assert!(organisms.iter().all(|o| (0.0..=1.0).contains(&o.fear())));
    }

    #[test]
    fn test_each_herbivore_relays_once() {
        let positions: Vec<(u16, u16)> = (0..20).map(|i| (i % 5, i / 5)).collect();
        let (config, mut organisms) = herd(&positions);
        let network = FearNetwork::new(&config);
        organisms[0].herbivore_state_mut().unwrap().learn([7]);

        let report = network.propagate(0, &mut organisms);
        assert!(report.relays <= organisms.len());
        assert_eq!(report.informed, organisms.len() - 1);
    }

    #[test]
    fn test_witness_kill() {
        let (config, mut organisms) = herd(&[(10, 10), (12, 11), (30, 30)]);
        let network = FearNetwork::new(&config);
        let lineage = Lineage::founded(50);
        let skip = HashSet::from([0]);

        let report = network.witness_kill(&mut organisms, &lineage, Position::new(10, 10), &skip);
        assert_eq!(report.witnesses, 1);
        let witness = organisms[1].herbivore_state().unwrap();
        assert!(witness.known_carnivores.contains(&50));
        assert!(witness.fear >= 0.8 && witness.fear <= 1.0);
        assert!(organisms[2].herbivore_state().unwrap().known_carnivores.is_empty());
    }
}
