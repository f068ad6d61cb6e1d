//! JSON wire format for whole-network export and import.
//!
//! Nodes use the persisted record layout (camelCase). Import runs through the
//! region loader, so a hand-edited or truncated file is pruned, not rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, NetworkConfig};
use crate::position::Position;
use crate::record::{LoadReport, NodeRecord, load_region};
use crate::simulation::Simulation;
use crate::world::GridWorld;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireExport {
    pub version: u32,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub config: NetworkConfig,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub sources: Vec<WireSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireSource {
    pub position: Position,
    pub power: u8,
}

#[derive(Debug)]
pub enum ImportError {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
    Config(ConfigError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Json(e) => write!(f, "invalid export JSON: {e}"),
            ImportError::UnsupportedVersion(v) => write!(
                f,
                "unsupported export version {v} (expected {CURRENT_VERSION})"
            ),
            ImportError::Config(e) => write!(f, "invalid config in export: {e}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Json(e) => Some(e),
            ImportError::Config(e) => Some(e),
            ImportError::UnsupportedVersion(_) => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(e: serde_json::Error) -> Self {
        ImportError::Json(e)
    }
}

impl From<ConfigError> for ImportError {
    fn from(e: ConfigError) -> Self {
        ImportError::Config(e)
    }
}

impl WireExport {
    pub fn from_simulation<A: Eq + std::hash::Hash + Clone>(sim: &Simulation<GridWorld, A>) -> Self {
        WireExport {
            version: CURRENT_VERSION,
            tick: sim.current_tick(),
            config: *sim.config(),
            nodes: sim.network().records(),
            sources: sim
                .world()
                .sources()
                .map(|(position, power)| WireSource { position, power })
                .collect(),
        }
    }

    pub fn into_simulation<A: Eq + std::hash::Hash + Clone>(
        self,
    ) -> Result<(Simulation<GridWorld, A>, LoadReport), ImportError> {
        if self.version != CURRENT_VERSION {
            return Err(ImportError::UnsupportedVersion(self.version));
        }
        let config = self.config.validated()?;
        let (network, report) = load_region(config, self.nodes);
        let mut world = GridWorld::new();
        for source in self.sources {
            world.set_source(source.position, source.power);
        }
        Ok((Simulation::resume(network, world, self.tick), report))
    }
}

/// Deserialize an export into a running simulation.
pub fn import_json(json: &str) -> Result<(Simulation<GridWorld>, LoadReport), ImportError> {
    let wire: WireExport = serde_json::from_str(json)?;
    wire.into_simulation()
}

/// Serialize a simulation to pretty JSON.
pub fn export_json(sim: &Simulation<GridWorld>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&WireExport::from_simulation(sim))
}
