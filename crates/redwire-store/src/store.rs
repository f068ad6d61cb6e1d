use std::hash::Hash;
use std::path::Path;

use rusqlite::{Connection, params};

use redwire_core::{
    ChainNetwork, ChainNode, GridWorld, LoadReport, MAX_SIGNAL, NetworkConfig, NodeRecord,
    Position, RegionLoader, Simulation,
};

use crate::error::Result;
use crate::schema;

const TICK_KEY: &str = "tick";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        set_metadata_on(&self.conn, key, value)
    }

    /// Last tick the saved world reached. 0 for a fresh world.
    pub fn tick(&self) -> Result<u64> {
        Ok(self
            .get_metadata(TICK_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    pub fn set_tick(&self, tick: u64) -> Result<()> {
        self.set_metadata(TICK_KEY, &tick.to_string())
    }

    // --- Chain nodes ---

    /// Replace every stored node with the contents of `network`.
    pub fn save_network(&self, network: &ChainNetwork) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM chain_nodes", [])?;
        for node in network.nodes() {
            save_record_on(&tx, &NodeRecord::from_node(node))?;
        }
        tx.commit()?;
        tracing::debug!(nodes = network.len(), "network saved");
        Ok(())
    }

    /// Insert or replace a single node, e.g. after its connections changed.
    pub fn save_node(&self, node: &ChainNode) -> Result<()> {
        save_record_on(&self.conn, &NodeRecord::from_node(node))
    }

    /// Delete the node at `pos`. Peers still naming it are pruned on the next load.
    pub fn delete_node(&self, pos: Position) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM chain_nodes WHERE x = ?1 AND y = ?2 AND z = ?3",
            params![pos.x, pos.y, pos.z],
        )?;
        Ok(deleted > 0)
    }

    pub fn node_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM chain_nodes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Every stored record, unvalidated.
    pub fn load_records(&self) -> Result<Vec<NodeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, z, connections, cached_signal, pending_loss_ticks
             FROM chain_nodes ORDER BY x, y, z",
        )?;
        let rows: Vec<(i32, i32, i32, String, i64, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(x, y, z, connections, signal, pending)| {
                let position = Position::new(x, y, z);
                NodeRecord {
                    position,
                    connections: parse_connections(position, &connections),
                    cached_signal: signal.clamp(0, i64::from(MAX_SIGNAL)) as u8,
                    pending_loss_ticks: u32::try_from(pending).unwrap_or(0),
                }
            })
            .collect())
    }

    /// Load and validate the stored network against `config`.
    pub fn load_network(&self, config: NetworkConfig) -> Result<(ChainNetwork, LoadReport)> {
        let mut loader = RegionLoader::new(config);
        for record in self.load_records()? {
            loader.add(record);
        }
        Ok(loader.finish())
    }

    // --- Sources ---

    pub fn set_source(&self, pos: Position, power: u8) -> Result<()> {
        set_source_on(&self.conn, pos, power)
    }

    pub fn save_sources(&self, world: &GridWorld) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        save_sources_on(&tx, world)?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_sources(&self) -> Result<GridWorld> {
        let mut stmt = self
            .conn
            .prepare("SELECT x, y, z, power FROM sources ORDER BY x, y, z")?;
        let rows: Vec<(i32, i32, i32, i64)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut world = GridWorld::new();
        for (x, y, z, power) in rows {
            world.set_source(
                Position::new(x, y, z),
                power.clamp(0, i64::from(MAX_SIGNAL)) as u8,
            );
        }
        Ok(world)
    }

    // --- Whole simulation ---

    /// Save network, sources and tick in one transaction.
    pub fn save_simulation<A: Eq + Hash + Clone>(
        &self,
        sim: &Simulation<GridWorld, A>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM chain_nodes", [])?;
        for record in sim.network().records() {
            save_record_on(&tx, &record)?;
        }
        save_sources_on(&tx, sim.world())?;
        set_metadata_on(&tx, TICK_KEY, &sim.current_tick().to_string())?;
        tx.commit()?;
        tracing::debug!(
            nodes = sim.network().len(),
            tick = sim.current_tick(),
            "simulation saved"
        );
        Ok(())
    }

    pub fn load_simulation<A: Eq + Hash + Clone>(
        &self,
        config: NetworkConfig,
    ) -> Result<(Simulation<GridWorld, A>, LoadReport)> {
        let (network, report) = self.load_network(config)?;
        let world = self.load_sources()?;
        let tick = self.tick()?;
        Ok((Simulation::resume(network, world, tick), report))
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn save_record_on(conn: &Connection, record: &NodeRecord) -> Result<()> {
    let connections = serde_json::to_string(&record.connections)?;
    conn.execute(
        "INSERT OR REPLACE INTO chain_nodes (x, y, z, connections, cached_signal, pending_loss_ticks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.position.x,
            record.position.y,
            record.position.z,
            connections,
            record.cached_signal,
            record.pending_loss_ticks,
        ],
    )?;
    Ok(())
}

fn set_source_on(conn: &Connection, pos: Position, power: u8) -> Result<()> {
    if power == 0 {
        conn.execute(
            "DELETE FROM sources WHERE x = ?1 AND y = ?2 AND z = ?3",
            params![pos.x, pos.y, pos.z],
        )?;
    } else {
        conn.execute(
            "INSERT OR REPLACE INTO sources (x, y, z, power) VALUES (?1, ?2, ?3, ?4)",
            params![pos.x, pos.y, pos.z, power.min(MAX_SIGNAL)],
        )?;
    }
    Ok(())
}

fn save_sources_on(conn: &Connection, world: &GridWorld) -> Result<()> {
    conn.execute("DELETE FROM sources", [])?;
    for (pos, power) in world.sources() {
        set_source_on(conn, pos, power)?;
    }
    Ok(())
}

/// A corrupt connection list loses only that node's edges; the loader then
/// prunes the peers' now one-sided references.
fn parse_connections(at: Position, json: &str) -> Vec<Position> {
    match serde_json::from_str(json) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(%at, error = %e, "unreadable connection list, dropping it");
            Vec::new()
        }
    }
}
