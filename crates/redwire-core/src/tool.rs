//! Two-click pairing protocol driven by the connector tool.
//!
//! `Idle --crouch-click chain--> AnchorSet --crouch-click chain--> Idle`.
//! The second click always returns the tool to `Idle`, whatever the outcome.

use std::collections::HashMap;
use std::hash::Hash;

use crate::connection::ConnectError;
use crate::network::ChainNetwork;
use crate::position::Position;

/// What a single use of the tool did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    /// Not crouching, or not aimed at a chain. Tool state unchanged.
    Ignored,
    /// First click recorded.
    AnchorSet(Position),
    /// Second click: a connection was attempted and the anchor cleared.
    Attempted {
        anchor: Position,
        target: Position,
        result: Result<(), ConnectError>,
    },
}

impl Interaction {
    /// True if this interaction created a connection.
    pub fn connected(&self) -> bool {
        matches!(self, Interaction::Attempted { result: Ok(()), .. })
    }
}

/// Pairing state of one tool instance. `anchor == None` is `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectorTool {
    anchor: Option<Position>,
}

impl ConnectorTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<Position> {
        self.anchor
    }

    pub fn is_idle(&self) -> bool {
        self.anchor.is_none()
    }

    /// Drop a pending anchor without attempting anything.
    pub fn reset(&mut self) {
        self.anchor = None;
    }

    /// Use the tool on `target`.
    ///
    /// Clicking the anchor itself again counts as an attempt and fails with
    /// `InvalidTarget`, which also clears the anchor.
    pub fn interact(
        &mut self,
        network: &mut ChainNetwork,
        target: Position,
        crouching: bool,
    ) -> Interaction {
        if !crouching || !network.contains(target) {
            return Interaction::Ignored;
        }
        match self.anchor.take() {
            None => {
                self.anchor = Some(target);
                tracing::debug!(%target, "connector anchor set");
                Interaction::AnchorSet(target)
            }
            Some(anchor) => {
                let result = network.try_connect(anchor, target);
                if let Err(err) = &result {
                    tracing::info!(%anchor, %target, %err, "connection refused");
                }
                Interaction::Attempted {
                    anchor,
                    target,
                    result,
                }
            }
        }
    }
}

/// Tool state for every actor, keyed by whatever identifies an actor to the host.
#[derive(Clone, Debug)]
pub struct ConnectorSessions<A> {
    tools: HashMap<A, ConnectorTool>,
}

impl<A> Default for ConnectorSessions<A> {
    fn default() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }
}

impl<A: Eq + Hash + Clone> ConnectorSessions<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interact(
        &mut self,
        actor: &A,
        network: &mut ChainNetwork,
        target: Position,
        crouching: bool,
    ) -> Interaction {
        let tool = self.tools.entry(actor.clone()).or_default();
        let interaction = tool.interact(network, target, crouching);
        if tool.is_idle() {
            self.tools.remove(actor);
        }
        interaction
    }

    pub fn anchor(&self, actor: &A) -> Option<Position> {
        self.tools.get(actor).and_then(ConnectorTool::anchor)
    }

    /// Forget an actor's pending anchor (e.g. the actor left).
    pub fn clear(&mut self, actor: &A) {
        self.tools.remove(actor);
    }

    /// Drop every anchor pointing at `pos`, used when that chain is removed.
    pub fn forget_position(&mut self, pos: Position) {
        self.tools.retain(|_, tool| tool.anchor() != Some(pos));
    }

    /// Number of actors mid-pairing.
    pub fn active(&self) -> usize {
        self.tools.len()
    }
}
