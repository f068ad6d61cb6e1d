//! The host world as seen by the signal engine.

use std::collections::BTreeMap;

use crate::constants::MAX_SIGNAL;
use crate::position::Position;

/// What the engine needs from the surrounding simulation.
pub trait World {
    /// Ordinary redstone power arriving at `pos` from adjacent sources (0–15).
    fn direct_signal(&self, pos: Position) -> u8;

    /// Tell the blocks around `pos` that its output changed.
    fn notify_neighbors(&mut self, pos: Position);
}

/// In-memory world of redstone sources (levers, torches, blocks of redstone).
///
/// Direct input at a position is the strongest source face-adjacent to it.
/// Neighbor notifications are recorded so callers can react or assert on them.
#[derive(Clone, Debug, Default)]
pub struct GridWorld {
    sources: BTreeMap<Position, u8>,
    notifications: Vec<Position>,
}

impl GridWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a source's power. 0 removes it. Returns the positions whose direct
    /// input may have changed (the source's face neighbors).
    pub fn set_source(&mut self, pos: Position, power: u8) -> [Position; 6] {
        let power = power.min(MAX_SIGNAL);
        if power == 0 {
            self.sources.remove(&pos);
        } else {
            self.sources.insert(pos, power);
        }
        pos.neighbors()
    }

    pub fn source(&self, pos: Position) -> u8 {
        self.sources.get(&pos).copied().unwrap_or(0)
    }

    pub fn sources(&self) -> impl Iterator<Item = (Position, u8)> + '_ {
        self.sources.iter().map(|(p, s)| (*p, *s))
    }

    /// Neighbor notifications emitted since the last drain, in emission order.
    pub fn drain_notifications(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.notifications)
    }

    pub fn notifications(&self) -> &[Position] {
        &self.notifications
    }
}

impl World for GridWorld {
    fn direct_signal(&self, pos: Position) -> u8 {
        pos.neighbors()
            .iter()
            .map(|n| self.source(*n))
            .max()
            .unwrap_or(0)
    }

    fn notify_neighbors(&mut self, pos: Position) {
        self.notifications.push(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_signal_is_strongest_adjacent_source() {
        let mut world = GridWorld::new();
        let node = Position::new(0, 0, 0);
        world.set_source(Position::new(1, 0, 0), 7);
        world.set_source(Position::new(0, 1, 0), 12);
        // Diagonal sources don't count.
        world.set_source(Position::new(1, 1, 0), 15);

        assert_eq!(world.direct_signal(node), 12);
    }

    #[test]
    fn test_source_at_own_position_ignored() {
        let mut world = GridWorld::new();
        world.set_source(Position::new(0, 0, 0), 15);
        assert_eq!(world.direct_signal(Position::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_zero_power_removes_source() {
        let mut world = GridWorld::new();
        let lever = Position::new(0, 1, 0);
        world.set_source(lever, 15);
        world.set_source(lever, 0);
        assert_eq!(world.sources().count(), 0);
        assert_eq!(world.direct_signal(Position::new(0, 0, 0)), 0);
    }

    #[test]
    fn test_power_clamped() {
        let mut world = GridWorld::new();
        let changed = world.set_source(Position::new(0, 1, 0), 99);
        assert_eq!(world.source(Position::new(0, 1, 0)), 15);
        assert!(changed.contains(&Position::new(0, 0, 0)));
    }

    #[test]
    fn test_notifications_drain() {
        let mut world = GridWorld::new();
        world.notify_neighbors(Position::new(1, 1, 1));
        world.notify_neighbors(Position::new(2, 2, 2));
        assert_eq!(world.notifications().len(), 2);
        assert_eq!(
            world.drain_notifications(),
            vec![Position::new(1, 1, 1), Position::new(2, 2, 2)]
        );
        assert!(world.notifications().is_empty());
    }
}
