//! Persisted node records and region loading.
//!
//! A record never assumes its peers exist yet. Reciprocity is checked only
//! once a whole region has been collected, and anything that does not hold up
//! is pruned rather than treated as fatal.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::network::ChainNetwork;
use crate::node::ChainNode;
use crate::position::Position;

/// One persisted chain node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub position: Position,
    #[serde(default)]
    pub connections: Vec<Position>,
    #[serde(default)]
    pub cached_signal: u8,
    #[serde(default)]
    pub pending_loss_ticks: u32,
}

impl NodeRecord {
    pub fn from_node(node: &ChainNode) -> Self {
        Self {
            position: node.position(),
            connections: node.connections().iter().copied().collect(),
            cached_signal: node.cached_signal(),
            pending_loss_ticks: node.pending_loss_ticks(),
        }
    }

    /// Rebuild a node exactly as recorded. Peers are not checked here.
    pub fn into_node(self) -> ChainNode {
        ChainNode::restored(
            self.position,
            self.connections.into_iter().collect(),
            self.cached_signal,
            self.pending_loss_ticks,
        )
    }
}

impl ChainNetwork {
    /// Records for every node, in position order.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.nodes().map(NodeRecord::from_node).collect()
    }
}

/// What a region load had to throw away.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes: usize,
    /// Records for a position already loaded; the later one won.
    pub duplicates: Vec<Position>,
    /// References to positions with no chain.
    pub dangling: Vec<(Position, Position)>,
    /// References a node made to itself.
    pub self_references: Vec<Position>,
    /// References the peer did not reciprocate.
    pub one_sided: Vec<(Position, Position)>,
    /// Edges dropped because a node exceeded the connection cap.
    pub over_capacity: usize,
}

impl LoadReport {
    pub fn pruned(&self) -> usize {
        self.dangling.len() + self.self_references.len() + self.one_sided.len() + self.over_capacity
    }

    pub fn is_clean(&self) -> bool {
        self.pruned() == 0 && self.duplicates.is_empty()
    }
}

/// Collects records for a region and builds a consistent network from them.
#[derive(Debug)]
pub struct RegionLoader {
    config: NetworkConfig,
    records: BTreeMap<Position, NodeRecord>,
    duplicates: Vec<Position>,
}

impl RegionLoader {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            records: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Accept a record. Order does not matter.
    pub fn add(&mut self, record: NodeRecord) {
        let pos = record.position;
        if self.records.insert(pos, record).is_some() {
            self.duplicates.push(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate every reference against the complete region and build the network.
    pub fn finish(self) -> (ChainNetwork, LoadReport) {
        let present: BTreeSet<Position> = self.records.keys().copied().collect();
        let claimed: BTreeSet<(Position, Position)> = self
            .records
            .values()
            .flat_map(|r| r.connections.iter().map(move |c| (r.position, *c)))
            .collect();

        let mut report = LoadReport {
            nodes: self.records.len(),
            duplicates: self.duplicates,
            ..LoadReport::default()
        };
        let mut network = ChainNetwork::new(self.config);

        for (pos, mut record) in self.records {
            record.connections.sort();
            record.connections.dedup();
            record.connections.retain(|peer| {
                if *peer == pos {
                    report.self_references.push(pos);
                    false
                } else if !present.contains(peer) {
                    report.dangling.push((pos, *peer));
                    false
                } else if !claimed.contains(&(*peer, pos)) {
                    report.one_sided.push((pos, *peer));
                    false
                } else {
                    true
                }
            });
            network.insert_node(record.into_node());
        }

        // Only symmetric edges remain; trimming drops both sides together.
        report.over_capacity = network.repair();

        for (from, to) in &report.dangling {
            tracing::warn!(%from, %to, "pruned reference to missing chain");
        }
        for (from, to) in &report.one_sided {
            tracing::warn!(%from, %to, "pruned one-sided connection");
        }
        for pos in &report.self_references {
            tracing::warn!(%pos, "pruned self-connection");
        }
        for pos in &report.duplicates {
            tracing::warn!(%pos, "duplicate chain record, kept the last one");
        }
        tracing::info!(
            nodes = report.nodes,
            pruned = report.pruned(),
            "region loaded"
        );

        (network, report)
    }
}

/// Build a network from records in one step.
pub fn load_region(
    config: NetworkConfig,
    records: impl IntoIterator<Item = NodeRecord>,
) -> (ChainNetwork, LoadReport) {
    let mut loader = RegionLoader::new(config);
    for record in records {
        loader.add(record);
    }
    loader.finish()
}
