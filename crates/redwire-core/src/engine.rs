//! Tick-driven signal propagation with debounced loss.
//!
//! A node's target signal is `max(direct input, strongest peer report)`, where
//! a peer reports the direct input it read at its own last evaluation. Relay is
//! therefore exactly one hop: a connected pair cannot hold each other up after
//! their real sources go dark, and cycles need no special handling.
//!
//! Each tick runs in phases:
//! 1. audit the graph (backstop ticks only), repairing anything broken
//! 2. collect work: queued neighbor-changed events, dirty nodes, running
//!    countdowns, and every node on backstop ticks
//! 3. evaluate; a node whose direct input changed schedules its peers
//! 4. notify the world once for every node whose signal moved this tick
//!
//! Evaluating a node again within the same tick starts from the state it had
//! when the tick began, so any number of re-evaluations agree.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use crate::constants::MAX_SIGNAL;
use crate::network::ChainNetwork;
use crate::position::Position;
use crate::world::World;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationError {
    /// No chain exists at the evaluated position.
    MissingNode(Position),
    /// `node` lists `peer`, but no chain exists there. The peer was ignored.
    DanglingPeer { node: Position, peer: Position },
}

impl fmt::Display for PropagationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationError::MissingNode(pos) => write!(f, "no chain at {pos}"),
            PropagationError::DanglingPeer { node, peer } => {
                write!(f, "chain at {node} references missing peer {peer}")
            }
        }
    }
}

impl std::error::Error for PropagationError {}

/// Result of evaluating one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub direct_input: u8,
    pub peer_signal: u8,
    pub cached_signal: u8,
    /// The direct input differs from what the node read last time.
    pub direct_changed: bool,
    pub dangling_peers: Vec<Position>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalChange {
    pub pos: Position,
    pub from: u8,
    pub to: u8,
}

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub backstop: bool,
    /// Evaluations run, counting re-evaluations of the same node.
    pub evaluated: usize,
    pub changed: Vec<SignalChange>,
    pub failures: Vec<PropagationError>,
    /// Edges dropped by the backstop audit.
    pub repaired: usize,
}

#[derive(Clone, Debug, Default)]
pub struct SignalEngine {
    tick: u64,
    events: BTreeSet<Position>,
    dirty: BTreeSet<Position>,
}

impl SignalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume at a previously reached tick.
    pub fn starting_at(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// The last tick started.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Queue a "neighbor changed" notification for the chain at `pos`.
    pub fn neighbor_changed(&mut self, pos: Position) {
        self.events.insert(pos);
    }

    /// Schedule `pos` for evaluation on the next tick after a graph mutation.
    pub fn mark_dirty(&mut self, pos: Position) {
        self.dirty.insert(pos);
    }

    pub fn pending(&self) -> usize {
        self.events.len() + self.dirty.len()
    }

    /// Run one tick.
    pub fn tick<W: World + ?Sized>(
        &mut self,
        network: &mut ChainNetwork,
        world: &mut W,
    ) -> TickReport {
        self.tick += 1;
        let tick = self.tick;
        let interval = u64::from(network.config().update_interval_ticks.max(1));
        let backstop = tick % interval == 0;
        let mut report = TickReport {
            tick,
            backstop,
            ..TickReport::default()
        };

        if backstop {
            report.repaired = self.audit(network);
        }

        let mut work: BTreeSet<Position> = std::mem::take(&mut self.events);
        work.append(&mut self.dirty);
        if backstop {
            work.extend(network.positions());
        } else {
            work.extend(
                network
                    .nodes()
                    .filter(|n| n.is_counting_down())
                    .map(|n| n.position()),
            );
        }
        work.retain(|pos| {
            let present = network.contains(*pos);
            if !present {
                tracing::debug!(%pos, tick, "dropping update for position without chain");
            }
            present
        });

        let mut queue: VecDeque<Position> = work.into_iter().collect();
        let mut queued: BTreeSet<Position> = queue.iter().copied().collect();
        let mut cascaded: BTreeSet<Position> = BTreeSet::new();
        let mut touched: BTreeSet<Position> = BTreeSet::new();

        while let Some(pos) = queue.pop_front() {
            queued.remove(&pos);
            report.evaluated += 1;
            match self.evaluate(network, &*world, pos) {
                Ok(eval) => {
                    touched.insert(pos);
                    for peer in &eval.dangling_peers {
                        let failure = PropagationError::DanglingPeer {
                            node: pos,
                            peer: *peer,
                        };
                        tracing::warn!(%failure, tick, "skipped peer during propagation");
                        report.failures.push(failure);
                    }
                    // Peers read our direct input; re-evaluate them once if it moved.
                    if eval.direct_changed && cascaded.insert(pos) {
                        let peers = network
                            .node(pos)
                            .map(|n| n.connections().iter().copied().collect::<Vec<_>>())
                            .unwrap_or_default();
                        for peer in peers {
                            if network.contains(peer) && queued.insert(peer) {
                                queue.push_back(peer);
                            }
                        }
                    }
                }
                Err(failure) => {
                    tracing::warn!(%failure, tick, "skipped node during propagation");
                    report.failures.push(failure);
                }
            }
        }

        for pos in touched {
            let Some(node) = network.node(pos) else {
                continue;
            };
            let to = node.cached_signal();
            let from = node.signal_at_start_of(tick).unwrap_or(to);
            if from != to {
                tracing::debug!(%pos, from, to, tick, "chain signal changed");
                world.notify_neighbors(pos);
                report.changed.push(SignalChange { pos, from, to });
            }
        }

        report
    }

    /// Recompute the chain at `pos` within the current tick.
    ///
    /// Pure in (direct input, peer reports, state at start of tick): calling it
    /// repeatedly in one tick with unchanged inputs leaves the node as the first
    /// call did.
    pub fn evaluate<W: World + ?Sized>(
        &self,
        network: &mut ChainNetwork,
        world: &W,
        pos: Position,
    ) -> Result<Evaluation, PropagationError> {
        let node = network
            .node(pos)
            .ok_or(PropagationError::MissingNode(pos))?;

        let mut peer_signal = 0;
        let mut dangling_peers = Vec::new();
        for peer in node.connections() {
            if *peer == pos {
                continue;
            }
            match network.node(*peer) {
                Some(other) => peer_signal = peer_signal.max(other.last_direct_input),
                None => dangling_peers.push(*peer),
            }
        }

        let direct_input = world.direct_signal(pos).min(MAX_SIGNAL);
        let delay = network.config().signal_loss_delay_ticks;
        let tick = self.tick;

        let node = network
            .node_mut(pos)
            .ok_or(PropagationError::MissingNode(pos))?;
        let prior = node.prior_for_tick(tick);
        let direct_changed = node.last_direct_input != direct_input;
        node.last_direct_input = direct_input;
        node.loss = prior.settle(direct_input.max(peer_signal), delay);

        Ok(Evaluation {
            direct_input,
            peer_signal,
            cached_signal: node.cached_signal(),
            direct_changed,
            dangling_peers,
        })
    }

    fn audit(&self, network: &mut ChainNetwork) -> usize {
        debug_assert!(
            network.audit().is_empty(),
            "connection graph invariants broken: {:?}",
            network.audit()
        );
        self.repair_graph(network)
    }

    /// Repair whatever the audit finds. Returns the edges dropped.
    fn repair_graph(&self, network: &mut ChainNetwork) -> usize {
        let violations = network.audit();
        if violations.is_empty() {
            return 0;
        }
        let repaired = network.repair();
        tracing::warn!(
            tick = self.tick,
            violations = violations.len(),
            repaired,
            "connection graph repaired"
        );
        repaired
    }
}
