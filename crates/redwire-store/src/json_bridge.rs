use std::fs;
use std::path::Path;

use redwire_core::{LoadReport, NetworkConfig, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Outcome of an import.
#[derive(Debug)]
pub struct Imported {
    pub report: LoadReport,
    /// Config carried by the export. The store does not keep it: the next
    /// load runs under whatever config the caller passes.
    pub config: NetworkConfig,
}

impl Store {
    /// Import a JSON export file, replacing this store's contents.
    pub fn import_json_file(&self, path: &Path) -> Result<Imported> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    /// Import a JSON export string, replacing this store's contents.
    /// Broken references in the export are pruned before anything is written.
    pub fn import_json_str(&self, json: &str) -> Result<Imported> {
        let (sim, report) =
            import_json(json).map_err(|e| StoreError::InvalidData(format!("invalid export: {e}")))?;
        self.save_simulation(&sim)?;
        Ok(Imported {
            report,
            config: *sim.config(),
        })
    }

    /// Export the store contents to a JSON file.
    pub fn export_json_file(&self, path: &Path, config: NetworkConfig) -> Result<()> {
        let json = self.export_json_string(config)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Export the store contents as a JSON string, validated against `config`.
    pub fn export_json_string(&self, config: NetworkConfig) -> Result<String> {
        let (sim, _) = self.load_simulation(config)?;
        Ok(export_json(&sim)?)
    }
}
