//! Connection manager: the only code that creates or removes edges.
//!
//! Every edge is written to both endpoints inside one `&mut` call, so no
//! reader can observe a half-connected pair.

use std::fmt;

use crate::network::ChainNetwork;
use crate::position::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidTargetReason {
    /// Both ends are the same chain.
    SelfConnection,
    /// There is no chain node at this position.
    NotAChain(Position),
}

/// Why a connection was refused. The graph is untouched in every case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectError {
    TooFar { distance_squared: u64, max: u32 },
    TooManyConnections { at: Position, limit: usize },
    AlreadyConnected,
    InvalidTarget(InvalidTargetReason),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::TooFar {
                distance_squared,
                max,
            } => write!(
                f,
                "too far: {:.1} blocks apart (max {max})",
                (*distance_squared as f64).sqrt()
            ),
            ConnectError::TooManyConnections { at, limit } => {
                write!(f, "chain at {at} already has {limit} connections")
            }
            ConnectError::AlreadyConnected => write!(f, "already connected"),
            ConnectError::InvalidTarget(InvalidTargetReason::SelfConnection) => {
                write!(f, "cannot connect a chain to itself")
            }
            ConnectError::InvalidTarget(InvalidTargetReason::NotAChain(pos)) => {
                write!(f, "no chain at {pos}")
            }
        }
    }
}

impl std::error::Error for ConnectError {}

impl ChainNetwork {
    /// Connect `a` and `b`, validating every precondition before mutating anything.
    pub fn try_connect(&mut self, a: Position, b: Position) -> Result<(), ConnectError> {
        if a == b {
            return Err(ConnectError::InvalidTarget(
                InvalidTargetReason::SelfConnection,
            ));
        }
        let node_a = self.node(a).ok_or(ConnectError::InvalidTarget(
            InvalidTargetReason::NotAChain(a),
        ))?;
        let node_b = self.node(b).ok_or(ConnectError::InvalidTarget(
            InvalidTargetReason::NotAChain(b),
        ))?;

        let max = self.config().max_connection_distance;
        if !a.is_within(b, max) {
            return Err(ConnectError::TooFar {
                distance_squared: a.distance_squared(b),
                max,
            });
        }
        if node_a.is_connected_to(b) || node_b.is_connected_to(a) {
            return Err(ConnectError::AlreadyConnected);
        }
        let limit = self.config().max_connections_per_chain;
        for node in [node_a, node_b] {
            if node.connection_count() >= limit {
                return Err(ConnectError::TooManyConnections {
                    at: node.position(),
                    limit,
                });
            }
        }

        self.link(a, b);
        tracing::info!(%a, %b, "chains connected");
        Ok(())
    }

    /// Remove the connection between `a` and `b`. No-op if they are not connected.
    /// Returns whether anything was removed.
    pub fn disconnect(&mut self, a: Position, b: Position) -> bool {
        let removed = self.unlink(a, b);
        if removed {
            tracing::info!(%a, %b, "chains disconnected");
        }
        debug_assert!(!self.is_linked_either_way(a, b));
        removed
    }

    /// Excise `pos` from every peer. Must run before the node itself is discarded;
    /// afterwards no chain references `pos`. Returns the former peers.
    pub fn on_node_removed(&mut self, pos: Position) -> Vec<Position> {
        let peers: Vec<Position> = match self.node(pos) {
            Some(node) => node.connections().iter().copied().collect(),
            None => return Vec::new(),
        };
        for peer in &peers {
            self.disconnect(*peer, pos);
        }
        debug_assert!(self.node(pos).is_none_or(|n| n.connections().is_empty()));
        peers
    }

    fn link(&mut self, a: Position, b: Position) {
        if let Some(node) = self.node_mut(a) {
            node.connections.insert(b);
        }
        if let Some(node) = self.node_mut(b) {
            node.connections.insert(a);
        }
        debug_assert!(self.is_linked_both_ways(a, b));
    }

    fn is_linked_both_ways(&self, a: Position, b: Position) -> bool {
        self.node(a).is_some_and(|n| n.is_connected_to(b))
            && self.node(b).is_some_and(|n| n.is_connected_to(a))
    }

    fn is_linked_either_way(&self, a: Position, b: Position) -> bool {
        self.node(a).is_some_and(|n| n.is_connected_to(b))
            || self.node(b).is_some_and(|n| n.is_connected_to(a))
    }
}
