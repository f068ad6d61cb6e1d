//! `redwire.toml` loading.
//!
//! ```toml
//! max_connection_distance = 24
//! max_connections_per_chain = 5
//! update_interval_ticks = 20
//! signal_loss_delay_ticks = 1
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use redwire_core::NetworkConfig;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "redwire.toml";

pub fn parse_config(content: &str) -> Result<NetworkConfig> {
    let config: NetworkConfig = toml::from_str(content)?;
    Ok(config.validated()?)
}

pub fn load_config(path: &Path) -> Result<NetworkConfig> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let config = parse_config(&content)?;
            tracing::debug!(path = %path.display(), ?config, "loaded config");
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(NetworkConfig::default())
        }
        Err(e) => Err(StoreError::InvalidData(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}
