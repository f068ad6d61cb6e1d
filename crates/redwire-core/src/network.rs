use std::collections::BTreeMap;
use std::fmt;

use crate::config::NetworkConfig;
use crate::node::ChainNode;
use crate::position::Position;

/// A graph invariant found broken by [`ChainNetwork::audit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `from` lists `to`, but `to` does not list `from`.
    Asymmetric { from: Position, to: Position },
    /// A node lists itself.
    SelfReference(Position),
    /// `from` lists a position with no chain node.
    Dangling { from: Position, to: Position },
    /// A node holds more connections than the configured cap.
    OverCapacity {
        at: Position,
        count: usize,
        limit: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asymmetric { from, to } => {
                write!(f, "one-sided connection {from} -> {to}")
            }
            Self::SelfReference(at) => write!(f, "chain at {at} is connected to itself"),
            Self::Dangling { from, to } => {
                write!(f, "chain at {from} references missing chain at {to}")
            }
            Self::OverCapacity { at, count, limit } => {
                write!(f, "chain at {at} holds {count} connections (limit {limit})")
            }
        }
    }
}

/// One undirected connection as seen by a cable renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CableSegment {
    pub from: Position,
    pub to: Position,
    /// Signal of the owning (lower) end.
    pub signal: u8,
}

/// Position → ChainNode index plus the static config the graph is validated against.
///
/// Every operation on the graph goes through this context; nothing is global.
#[derive(Clone, Debug, Default)]
pub struct ChainNetwork {
    config: NetworkConfig,
    pub(crate) nodes: BTreeMap<Position, ChainNode>,
}

impl ChainNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// The chain node at `pos`, if there is one.
    pub fn node(&self, pos: Position) -> Option<&ChainNode> {
        self.nodes.get(&pos)
    }

    pub(crate) fn node_mut(&mut self, pos: Position) -> Option<&mut ChainNode> {
        self.nodes.get_mut(&pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.nodes.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in position order.
    pub fn nodes(&self) -> impl Iterator<Item = &ChainNode> {
        self.nodes.values()
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.nodes.keys().copied()
    }

    /// Total number of undirected connections.
    pub fn connection_count(&self) -> usize {
        self.cable_segments().count()
    }

    /// Create an empty chain node. Returns false if one already exists at `pos`.
    pub fn place(&mut self, pos: Position) -> bool {
        if self.nodes.contains_key(&pos) {
            return false;
        }
        self.nodes.insert(pos, ChainNode::new(pos));
        tracing::debug!(%pos, "chain placed");
        true
    }

    /// Remove the chain at `pos`, excising it from every peer first.
    /// Returns the former peers, or None if there was no chain.
    pub fn remove(&mut self, pos: Position) -> Option<Vec<Position>> {
        if !self.nodes.contains_key(&pos) {
            return None;
        }
        let peers = self.on_node_removed(pos);
        self.nodes.remove(&pos);
        tracing::info!(%pos, peers = peers.len(), "chain removed");
        Some(peers)
    }

    pub(crate) fn insert_node(&mut self, node: ChainNode) {
        self.nodes.insert(node.position(), node);
    }

    /// Every connection exactly once, owned by its lower end.
    pub fn cable_segments(&self) -> impl Iterator<Item = CableSegment> + '_ {
        self.nodes.values().flat_map(|node| {
            let from = node.position();
            let signal = node.cached_signal();
            node.connections()
                .iter()
                .copied()
                .filter(move |to| from < *to)
                .map(move |to| CableSegment { from, to, signal })
        })
    }

    /// Check every graph invariant. Empty means the graph is consistent.
    pub fn audit(&self) -> Vec<InvariantViolation> {
        let limit = self.config.max_connections_per_chain;
        let mut violations = Vec::new();
        for (pos, node) in &self.nodes {
            if node.connections.len() > limit {
                violations.push(InvariantViolation::OverCapacity {
                    at: *pos,
                    count: node.connections.len(),
                    limit,
                });
            }
            for peer in &node.connections {
                if peer == pos {
                    violations.push(InvariantViolation::SelfReference(*pos));
                    continue;
                }
                match self.nodes.get(peer) {
                    None => violations.push(InvariantViolation::Dangling {
                        from: *pos,
                        to: *peer,
                    }),
                    Some(other) if !other.connections.contains(pos) => {
                        violations.push(InvariantViolation::Asymmetric {
                            from: *pos,
                            to: *peer,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        violations
    }

    /// Restore every invariant by dropping offending edges. Returns the number of
    /// edges dropped. One-sided edges are dropped rather than completed, since the
    /// missing half was never committed.
    pub fn repair(&mut self) -> usize {
        let mut dropped = 0;
        for violation in self.audit() {
            match violation {
                InvariantViolation::SelfReference(at) => {
                    if let Some(node) = self.nodes.get_mut(&at)
                        && node.connections.remove(&at)
                    {
                        dropped += 1;
                    }
                }
                InvariantViolation::Dangling { from, to }
                | InvariantViolation::Asymmetric { from, to } => {
                    if let Some(node) = self.nodes.get_mut(&from)
                        && node.connections.remove(&to)
                    {
                        dropped += 1;
                    }
                }
                // Handled below, after one-sided edges are gone.
                InvariantViolation::OverCapacity { .. } => continue,
            }
            tracing::warn!(%violation, "repaired connection graph");
        }
        dropped + self.trim_over_capacity()
    }

    /// Drop the farthest-ordered connections of any node over the cap, both sides.
    fn trim_over_capacity(&mut self) -> usize {
        let limit = self.config.max_connections_per_chain;
        let over: Vec<Position> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.connections.len() > limit)
            .map(|(p, _)| *p)
            .collect();

        let mut dropped = 0;
        for pos in over {
            let excess: Vec<Position> = match self.nodes.get(&pos) {
                Some(node) => node.connections.iter().skip(limit).copied().collect(),
                None => continue,
            };
            for peer in excess {
                self.unlink(pos, peer);
                dropped += 1;
                tracing::warn!(%pos, %peer, limit, "dropped connection over capacity");
            }
        }
        dropped
    }

    /// Remove both directions of an edge, whatever state each side is in.
    pub(crate) fn unlink(&mut self, a: Position, b: Position) -> bool {
        let mut removed = false;
        if let Some(node) = self.nodes.get_mut(&a) {
            removed |= node.connections.remove(&b);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            removed |= node.connections.remove(&a);
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn force_one_sided(&mut self, from: Position, to: Position) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.connections.insert(to);
        }
    }
}
