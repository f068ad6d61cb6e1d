//! Static network configuration, fixed for the lifetime of a simulation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_CONNECTION_DISTANCE, DEFAULT_MAX_CONNECTIONS_PER_CHAIN,
    DEFAULT_SIGNAL_LOSS_DELAY_TICKS, DEFAULT_UPDATE_INTERVAL_TICKS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Maximum distance (in blocks) between two connected chains. Must be ≥ 1.
    pub max_connection_distance: u32,
    /// Maximum connections per chain. Must be ≥ 1.
    pub max_connections_per_chain: usize,
    /// Backstop interval in ticks for re-evaluating every node. Must be ≥ 1.
    pub update_interval_ticks: u32,
    /// Ticks to hold a lost signal before clearing it. 0 clears immediately.
    pub signal_loss_delay_ticks: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_connection_distance: DEFAULT_MAX_CONNECTION_DISTANCE,
            max_connections_per_chain: DEFAULT_MAX_CONNECTIONS_PER_CHAIN,
            update_interval_ticks: DEFAULT_UPDATE_INTERVAL_TICKS,
            signal_loss_delay_ticks: DEFAULT_SIGNAL_LOSS_DELAY_TICKS,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connection_distance < 1 {
            return Err(ConfigError::OutOfRange {
                field: "max_connection_distance",
                value: u64::from(self.max_connection_distance),
                min: 1,
            });
        }
        if self.max_connections_per_chain < 1 {
            return Err(ConfigError::OutOfRange {
                field: "max_connections_per_chain",
                value: self.max_connections_per_chain as u64,
                min: 1,
            });
        }
        if self.update_interval_ticks < 1 {
            return Err(ConfigError::OutOfRange {
                field: "update_interval_ticks",
                value: u64::from(self.update_interval_ticks),
                min: 1,
            });
        }
        Ok(())
    }

    /// Returns the config if it is valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate().map(|()| self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { field, value, min } => {
                write!(f, "{field} = {value} is out of range (minimum {min})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
