//! One chain network, its signal engine and the world it sits in.
//!
//! Every graph mutation made through this context schedules the affected
//! nodes for the next tick, so callers never have to track that themselves.

use std::hash::Hash;

use crate::config::NetworkConfig;
use crate::connection::ConnectError;
use crate::engine::{PropagationError, SignalEngine, TickReport};
use crate::network::ChainNetwork;
use crate::position::Position;
use crate::tool::{ConnectorSessions, Interaction};
use crate::world::{GridWorld, World};

/// Totals over a run of ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub last_tick: u64,
    pub evaluated: usize,
    pub changes: usize,
    pub failures: Vec<PropagationError>,
    pub repaired: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: TickReport) {
        self.ticks += 1;
        self.last_tick = report.tick;
        self.evaluated += report.evaluated;
        self.changes += report.changed.len();
        self.failures.extend(report.failures);
        self.repaired += report.repaired;
    }
}

#[derive(Debug)]
pub struct Simulation<W, A = String> {
    network: ChainNetwork,
    engine: SignalEngine,
    world: W,
    sessions: ConnectorSessions<A>,
}

impl<W: World, A: Eq + Hash + Clone> Simulation<W, A> {
    pub fn new(config: NetworkConfig, world: W) -> Self {
        Self {
            network: ChainNetwork::new(config),
            engine: SignalEngine::new(),
            world,
            sessions: ConnectorSessions::new(),
        }
    }

    /// Resume from a loaded network. Every node is re-evaluated on the next
    /// tick so direct inputs are re-read from the world.
    pub fn resume(network: ChainNetwork, world: W, tick: u64) -> Self {
        let mut engine = SignalEngine::starting_at(tick);
        for pos in network.positions() {
            engine.mark_dirty(pos);
        }
        Self {
            network,
            engine,
            world,
            sessions: ConnectorSessions::new(),
        }
    }

    pub fn network(&self) -> &ChainNetwork {
        &self.network
    }

    pub fn config(&self) -> &NetworkConfig {
        self.network.config()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Direct access to the world. Changes made here are only seen by chains
    /// once `neighbor_changed` is called for them, or on the next backstop.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn current_tick(&self) -> u64 {
        self.engine.current_tick()
    }

    pub fn sessions(&self) -> &ConnectorSessions<A> {
        &self.sessions
    }

    pub fn place_chain(&mut self, pos: Position) -> bool {
        let placed = self.network.place(pos);
        if placed {
            self.engine.mark_dirty(pos);
        }
        placed
    }

    /// Remove a chain. Former peers are re-evaluated and any pending tool
    /// anchor on it is dropped.
    pub fn remove_chain(&mut self, pos: Position) -> Option<Vec<Position>> {
        let was_powered = self
            .network
            .node(pos)
            .is_some_and(|node| node.cached_signal() > 0);
        let peers = self.network.remove(pos)?;
        for peer in &peers {
            self.engine.mark_dirty(*peer);
        }
        self.sessions.forget_position(pos);
        if was_powered {
            self.world.notify_neighbors(pos);
        }
        Some(peers)
    }

    pub fn use_connector(&mut self, actor: &A, pos: Position, crouching: bool) -> Interaction {
        let interaction = self
            .sessions
            .interact(actor, &mut self.network, pos, crouching);
        if let Interaction::Attempted {
            anchor,
            target,
            result: Ok(()),
        } = interaction
        {
            self.engine.mark_dirty(anchor);
            self.engine.mark_dirty(target);
        }
        interaction
    }

    /// Connect two chains directly, bypassing the tool.
    pub fn connect(&mut self, a: Position, b: Position) -> Result<(), ConnectError> {
        self.network.try_connect(a, b)?;
        self.engine.mark_dirty(a);
        self.engine.mark_dirty(b);
        Ok(())
    }

    pub fn disconnect(&mut self, a: Position, b: Position) -> bool {
        let removed = self.network.disconnect(a, b);
        if removed {
            self.engine.mark_dirty(a);
            self.engine.mark_dirty(b);
        }
        removed
    }

    pub fn neighbor_changed(&mut self, pos: Position) {
        self.engine.neighbor_changed(pos);
    }

    pub fn tick(&mut self) -> TickReport {
        self.engine.tick(&mut self.network, &mut self.world)
    }

    pub fn run(&mut self, ticks: u64) -> RunSummary {
        let mut summary = RunSummary::default();
        for _ in 0..ticks {
            summary.absorb(self.tick());
        }
        summary
    }

    /// Take the parts back out, e.g. to persist them.
    pub fn into_parts(self) -> (ChainNetwork, W, u64) {
        let tick = self.engine.current_tick();
        (self.network, self.world, tick)
    }
}

impl<A: Eq + Hash + Clone> Simulation<GridWorld, A> {
    /// Set a redstone source and notify the blocks around it.
    pub fn set_source(&mut self, pos: Position, power: u8) {
        for neighbor in self.world.set_source(pos, power) {
            if self.network.contains(neighbor) {
                self.engine.neighbor_changed(neighbor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32, z: i32) -> Position {
        Position::new(x, y, z)
    }

    fn sim() -> Simulation<GridWorld> {
        Simulation::new(NetworkConfig::default(), GridWorld::new())
    }

    #[test]
    fn test_connect_through_tool_then_relay() {
        let mut sim = sim();
        let (a, b) = (p(1, 2, 1), p(3, 2, 3));
        sim.place_chain(a);
        sim.place_chain(b);
        let actor = "steve".to_string();

        sim.use_connector(&actor, a, true);
        assert!(sim.use_connector(&actor, b, true).connected());

        sim.set_source(a.offset(0, -1, 0), 15);
        sim.tick();
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 15);
    }

    #[test]
    fn test_disconnect_drops_relayed_signal() {
        let mut sim = sim();
        let (a, b) = (p(0, 0, 0), p(4, 0, 0));
        sim.place_chain(a);
        sim.place_chain(b);
        sim.connect(a, b).unwrap();
        sim.set_source(a.offset(0, 1, 0), 12);
        sim.tick();
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 12);

        assert!(sim.disconnect(a, b));
        // default loss delay of 1 tick
        sim.tick();
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 12);
        sim.tick();
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 0);
        assert_eq!(sim.network().node(a).unwrap().cached_signal(), 12);
    }

    #[test]
    fn test_remove_chain_releases_peer_and_anchor() {
        let mut sim = sim();
        let (a, b) = (p(0, 0, 0), p(4, 0, 0));
        sim.place_chain(a);
        sim.place_chain(b);
        sim.connect(a, b).unwrap();
        sim.set_source(a.offset(0, 1, 0), 15);
        sim.tick();
        sim.world_mut().drain_notifications();

        let actor = "alex".to_string();
        sim.use_connector(&actor, a, true);
        assert_eq!(sim.remove_chain(a), Some(vec![b]));
        assert_eq!(sim.sessions().anchor(&actor), None);
        assert_eq!(sim.world().notifications(), &[a]);

        sim.run(2);
        assert_eq!(sim.network().node(b).unwrap().cached_signal(), 0);
        assert!(sim.network().node(b).unwrap().connections().is_empty());
    }

    #[test]
    fn test_resume_rereads_direct_inputs() {
        let mut world = GridWorld::new();
        let a = p(0, 0, 0);
        world.set_source(a.offset(1, 0, 0), 8);
        let mut net = ChainNetwork::new(NetworkConfig::default());
        net.place(a);

        let mut sim: Simulation<GridWorld> = Simulation::resume(net, world, 40);
        let report = sim.tick();
        assert_eq!(report.tick, 41);
        assert_eq!(sim.network().node(a).unwrap().cached_signal(), 8);
    }

    #[test]
    fn test_run_summarizes() {
        let mut sim = sim();
        let a = p(0, 0, 0);
        sim.place_chain(a);
        sim.set_source(a.offset(0, 1, 0), 3);
        let summary = sim.run(20);
        assert_eq!(summary.ticks, 20);
        assert_eq!(summary.last_tick, 20);
        assert_eq!(summary.changes, 1);
        assert!(summary.failures.is_empty());
    }
}
