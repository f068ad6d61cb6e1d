//! Wireless redstone chain network.
//!
//! Chain nodes at block positions are paired into a symmetric, capped,
//! distance-limited graph. A tick-driven engine relays each node's direct
//! redstone input one hop to its peers and debounces signal loss. A
//! two-click connector tool drives pairing, and persisted node records are
//! validated against each other only once a whole region has loaded.
//!
//! Zero I/O. The host world is reached through the [`World`] trait.

pub mod config;
pub mod connection;
pub mod constants;
pub mod engine;
pub mod network;
pub mod node;
pub mod position;
pub mod record;
pub mod serde_compat;
pub mod simulation;
pub mod tool;
pub mod world;

pub use config::{ConfigError, NetworkConfig};
pub use connection::{ConnectError, InvalidTargetReason};
pub use constants::{
    DEFAULT_MAX_CONNECTION_DISTANCE, DEFAULT_MAX_CONNECTIONS_PER_CHAIN,
    DEFAULT_SIGNAL_LOSS_DELAY_TICKS, DEFAULT_UPDATE_INTERVAL_TICKS, MAX_SIGNAL, TICKS_PER_SECOND,
};
pub use engine::{Evaluation, PropagationError, SignalChange, SignalEngine, TickReport};
pub use network::{CableSegment, ChainNetwork, InvariantViolation};
pub use node::ChainNode;
pub use position::{ParsePositionError, Position};
pub use record::{LoadReport, NodeRecord, RegionLoader, load_region};
pub use serde_compat::{CURRENT_VERSION, ImportError, WireExport, export_json, import_json};
pub use simulation::{RunSummary, Simulation};
pub use tool::{ConnectorSessions, ConnectorTool, Interaction};
pub use world::{GridWorld, World};
