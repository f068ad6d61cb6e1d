use std::collections::BTreeSet;

use crate::constants::MAX_SIGNAL;
use crate::position::Position;

/// Signal-holding part of a node's state: the value it emits and the
/// remaining ticks of a running loss countdown (0 = no countdown).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) struct LossState {
    pub cached_signal: u8,
    pub pending_loss_ticks: u32,
}

impl LossState {
    /// Next state given the freshly computed target signal.
    ///
    /// A nonzero target is adopted immediately and cancels any countdown.
    /// A zero target only clears the signal after `delay` consecutive ticks.
    pub fn settle(self, target: u8, delay: u32) -> Self {
        if target > 0 {
            return Self {
                cached_signal: target,
                pending_loss_ticks: 0,
            };
        }
        if self.cached_signal == 0 {
            return Self::default();
        }
        let remaining = if self.pending_loss_ticks == 0 {
            delay
        } else {
            self.pending_loss_ticks - 1
        };
        if remaining == 0 {
            Self::default()
        } else {
            Self {
                cached_signal: self.cached_signal,
                pending_loss_ticks: remaining,
            }
        }
    }
}

/// Loss state captured the first time a node is evaluated in a tick.
/// Later evaluations in the same tick restart from it.
#[derive(Clone, Copy, Debug)]
struct TickSnapshot {
    tick: u64,
    prior: LossState,
}

/// Per-position chain state.
#[derive(Clone, Debug)]
pub struct ChainNode {
    position: Position,
    pub(crate) connections: BTreeSet<Position>,
    pub(crate) loss: LossState,
    pub(crate) last_direct_input: u8,
    snapshot: Option<TickSnapshot>,
}

impl ChainNode {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            connections: BTreeSet::new(),
            loss: LossState::default(),
            last_direct_input: 0,
            snapshot: None,
        }
    }

    pub(crate) fn restored(
        position: Position,
        connections: BTreeSet<Position>,
        cached_signal: u8,
        pending_loss_ticks: u32,
    ) -> Self {
        Self {
            position,
            connections,
            loss: LossState {
                cached_signal: cached_signal.min(MAX_SIGNAL),
                pending_loss_ticks,
            },
            // Re-read from the world on the first evaluation after load.
            last_direct_input: 0,
            snapshot: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Positions of connected peers.
    pub fn connections(&self) -> &BTreeSet<Position> {
        &self.connections
    }

    /// Current effective output signal (0–15).
    pub fn cached_signal(&self) -> u8 {
        self.loss.cached_signal
    }

    pub fn is_connected_to(&self, other: Position) -> bool {
        self.connections.contains(&other)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn pending_loss_ticks(&self) -> u32 {
        self.loss.pending_loss_ticks
    }

    pub(crate) fn is_counting_down(&self) -> bool {
        self.loss.pending_loss_ticks > 0
    }

    /// Loss state as of the start of `tick`, recording it on first access.
    pub(crate) fn prior_for_tick(&mut self, tick: u64) -> LossState {
        match self.snapshot {
            Some(snap) if snap.tick == tick => snap.prior,
            _ => {
                self.snapshot = Some(TickSnapshot {
                    tick,
                    prior: self.loss,
                });
                self.loss
            }
        }
    }

    /// Signal this node held when `tick` started, if it was evaluated during it.
    pub(crate) fn signal_at_start_of(&self, tick: u64) -> Option<u8> {
        self.snapshot
            .filter(|snap| snap.tick == tick)
            .map(|snap| snap.prior.cached_signal)
    }
}
