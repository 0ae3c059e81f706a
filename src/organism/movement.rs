//! Grid movement primitives.
//!
//! Every step moves at most one cell along one axis and is clamped to the
//! grid, so positions never leave `[0, grid_size)`.

use crate::grid::Position;
use rand::prelude::*;

/// Cardinal direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    #[inline]
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[inline]
fn sign(v: i32) -> i32 {
    v.signum()
}

/// Random single-cell step that only happens with probability `speed`.
/// Returns true if the organism moved.
pub fn random_step<R: Rng + ?Sized>(pos: &mut Position, speed: f64, grid_size: usize, rng: &mut R) -> bool {
    let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
    if rng.gen::<f64>() >= speed {
        return false;
    }
    let (dx, dy) = direction.delta();
    let next = pos.offset_clamped(dx, dy, grid_size);
    let moved = next != *pos;
    *pos = next;
    moved
}

/// One step toward a target; picks an axis at random when both differ
pub fn step_toward<R: Rng + ?Sized>(pos: &mut Position, target: Position, grid_size: usize, rng: &mut R) {
    let dx = sign(target.x as i32 - pos.x as i32);
    let dy = sign(target.y as i32 - pos.y as i32);
    let (sx, sy) = if dx != 0 && dy != 0 {
        if rng.gen::<bool>() {
            (dx, 0)
        } else {
            (0, dy)
        }
    } else {
        (dx, dy)
    };
    *pos = pos.offset_clamped(sx, sy, grid_size);
}

/// One step that never reduces the Manhattan distance to `threat`.
///
/// Tries the away-axes first (random order when both apply), then sideways
/// moves along an axis the threat shares, stopping at the first candidate
/// the grid edge does not cancel.
pub fn step_away<R: Rng + ?Sized>(pos: &mut Position, threat: Position, grid_size: usize, rng: &mut R) {
    let dx = -sign(threat.x as i32 - pos.x as i32);
    let dy = -sign(threat.y as i32 - pos.y as i32);

    let mut away: Vec<(i32, i32)> = Vec::with_capacity(2);
    if dx != 0 {
        away.push((dx, 0));
    }
    if dy != 0 {
        away.push((0, dy));
    }
    away.shuffle(rng);

    let mut sideways: Vec<(i32, i32)> = Vec::with_capacity(4);
    if dx == 0 {
        sideways.extend([(1, 0), (-1, 0)]);
    }
    if dy == 0 {
        sideways.extend([(0, 1), (0, -1)]);
    }
    sideways.shuffle(rng);

    for (sx, sy) in away.into_iter().chain(sideways) {
        let next = pos.offset_clamped(sx, sy, grid_size);
        if next != *pos {
            *pos = next;
            return;
        }
    }
}
