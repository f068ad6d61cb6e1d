use std::path::{Path, PathBuf};
use std::{env, fs};

use redwire_core::{GridWorld, LoadReport, NetworkConfig, Simulation};

use crate::json_bridge::Imported;

use crate::config::{CONFIG_FILE, load_config};
use crate::error::{Result, StoreError};
use crate::store::Store;

/// Overrides the base directory when set.
pub const DATA_DIR_ENV: &str = "REDWIRE_DATA_DIR";

pub const DEFAULT_WORLD: &str = "default";

/// Base directory for all redwire storage: `$REDWIRE_DATA_DIR` or `~/.redwire`.
pub fn default_base_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs_home().join(".redwire")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Sanitize a world name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn resolve_world_name(name: Option<&str>) -> String {
    name.map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_WORLD.to_string())
}

/// One named world on disk plus the config it runs under.
///
/// Layout:
/// ```text
/// ~/.redwire/
/// ├── redwire.toml
/// └── worlds/
///     ├── default.db
///     └── <name>.db
/// ```
pub struct WorldStore {
    store: Store,
    config: NetworkConfig,
    name: String,
    base_dir: PathBuf,
}

impl WorldStore {
    /// Open (creating if needed) the named world.
    /// `base_dir`: override the base directory (for testing).
    pub fn open(name: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let worlds_dir = base.join("worlds");
        fs::create_dir_all(&worlds_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", worlds_dir.display()))
        })?;

        let config = load_config(&base.join(CONFIG_FILE))?;
        let name = resolve_world_name(name);
        let store = Store::open(&worlds_dir.join(format!("{name}.db")))?;
        tracing::debug!(world = %name, base = %base.display(), "world store opened");

        Ok(Self {
            store,
            config,
            name,
            base_dir: base,
        })
    }

    /// In-memory world (for testing).
    pub fn open_in_memory(config: NetworkConfig) -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory()?,
            config,
            name: "test".to_string(),
            base_dir: PathBuf::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Load the world, pruning anything that no longer holds together.
    pub fn load(&self) -> Result<(Simulation<GridWorld>, LoadReport)> {
        let (sim, report) = self.store.load_simulation(self.config)?;
        if !report.is_clean() {
            tracing::warn!(
                world = %self.name,
                pruned = report.pruned(),
                duplicates = report.duplicates.len(),
                "world needed repair on load"
            );
        }
        Ok((sim, report))
    }

    pub fn save(&self, sim: &Simulation<GridWorld>) -> Result<()> {
        self.store.save_simulation(sim)
    }

    /// Import an export into this world. The world keeps running under its
    /// own config; a differing export config is logged and reported.
    pub fn import_json_file(&self, path: &Path) -> Result<Imported> {
        let imported = self.store.import_json_file(path)?;
        if imported.config != self.config {
            tracing::warn!(
                world = %self.name,
                export = ?imported.config,
                world_config = ?self.config,
                "export config differs from the world config; the world config applies"
            );
        }
        Ok(imported)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        self.store.export_json_file(path, self.config)
    }

    pub fn export_json_string(&self) -> Result<String> {
        self.store.export_json_string(self.config)
    }
}

/// Names of every world saved under `base_dir`, sorted.
pub fn list_worlds(base_dir: &Path) -> Result<Vec<String>> {
    let worlds_dir = base_dir.join("worlds");
    let entries = match fs::read_dir(&worlds_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::InvalidData(format!(
                "failed to read {}: {e}",
                worlds_dir.display()
            )));
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "db") {
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .collect();
    names.sort();
    Ok(names)
}
