//! Grid coordinates and food sites.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A cell on the square grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    #[inline]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Uniformly random cell
    pub fn random<R: Rng + ?Sized>(rng: &mut R, grid_size: usize) -> Self {
        let max = grid_size.clamp(1, u16::MAX as usize) as u16;
        Self {
            x: rng.gen_range(0..max),
            y: rng.gen_range(0..max),
        }
    }

    /// Manhattan distance
    #[inline]
    pub fn manhattan(&self, other: Position) -> u32 {
        (self.x as i32 - other.x as i32).unsigned_abs() + (self.y as i32 - other.y as i32).unsigned_abs()
    }

    /// Apply an offset, clamping to `[0, grid_size)` on both axes
    #[inline]
    pub fn offset_clamped(&self, dx: i32, dy: i32, grid_size: usize) -> Self {
        let max = grid_size.clamp(1, u16::MAX as usize) as i32 - 1;
        Self {
            x: (self.x as i32 + dx).clamp(0, max) as u16,
            y: (self.y as i32 + dy).clamp(0, max) as u16,
        }
    }

    /// Clamp into the grid
    #[inline]
    pub fn clamped(&self, grid_size: usize) -> Self {
        self.offset_clamped(0, 0, grid_size)
    }
}

/// Food sites: present cells plus depleted cells awaiting respawn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodGrid {
    grid_size: usize,
    present: BTreeSet<Position>,
    /// Depleted cell -> frame it was eaten
    depleted: BTreeMap<Position, u64>,
}

impl FoodGrid {
    /// Create an empty food grid
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            present: BTreeSet::new(),
            depleted: BTreeMap::new(),
        }
    }

    /// Fixed layout drawn from its own seed, independent of the world RNG.
    /// Duplicate draws collapse onto one site.
    pub fn seeded(grid_size: usize, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut grid = Self::new(grid_size);
        for _ in 0..count {
            let pos = Position::random(&mut rng, grid_size);
            grid.present.insert(pos);
        }
        grid
    }

    /// Place food at a cell, returns false if already stocked
    pub fn place(&mut self, pos: Position) -> bool {
        self.present.insert(pos.clamped(self.grid_size))
    }

    #[inline]
    pub fn is_present(&self, pos: Position) -> bool {
        self.present.contains(&pos)
    }

    /// Frame a depleted site was eaten, if awaiting respawn
    #[inline]
    pub fn depleted_at(&self, pos: Position) -> Option<u64> {
        self.depleted.get(&pos).copied()
    }

    /// Number of stocked sites
    #[inline]
    pub fn len(&self) -> usize {
        self.present.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Number of sites awaiting respawn
    #[inline]
    pub fn pending(&self) -> usize {
        self.depleted.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.present.iter().copied()
    }

    /// Manhattan-nearest stocked site
    pub fn nearest(&self, from: Position) -> Option<Position> {
        self.present.iter().copied().min_by_key(|p| p.manhattan(from))
    }

    /// Eat the food at a cell and start its respawn timer
    pub fn consume(&mut self, pos: Position, frame: u64) -> bool {
        if self.present.remove(&pos) {
            self.depleted.insert(pos, frame);
            true
        } else {
            false
        }
    }

    /// Restock depleted sites whose delay has elapsed, returns count restocked
    pub fn respawn_due(&mut self, frame: u64, delay: u64) -> usize {
        let due: Vec<Position> = self
            .depleted
            .iter()
            .filter(|(_, &eaten)| frame.saturating_sub(eaten) >= delay)
            .map(|(&pos, _)| pos)
            .collect();

        for pos in &due {
            self.depleted.remove(pos);
            self.present.insert(*pos);
        }

        due.len()
    }

    /// Add food at random empty cells until `target` sites are stocked.
    ///
    /// Each missing site gets `grid_size * retry_factor` draws; a site that
    /// cannot be placed ends the top-up so a saturated grid never spins.
    pub fn top_up<R: Rng + ?Sized>(&mut self, target: usize, retry_factor: usize, rng: &mut R) -> usize {
        let max_tries = (self.grid_size * retry_factor).max(1);
        let mut added = 0;

        while self.present.len() < target {
            let mut placed = false;
            for _ in 0..max_tries {
                let pos = Position::random(rng, self.grid_size);
                if self.present.insert(pos) {
                    placed = true;
                    break;
                }
            }
            if !placed {
                break;
            }
            added += 1;
        }

        added
    }

    /// Get grid size
    #[inline]
    pub fn size(&self) -> usize {
        self.grid_size
    }
}
