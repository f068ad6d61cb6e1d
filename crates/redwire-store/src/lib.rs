pub mod config;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;
pub mod world_store;

pub use config::{CONFIG_FILE, load_config, parse_config};
pub use error::{Result, StoreError};
pub use json_bridge::Imported;
pub use store::Store;
pub use world_store::{DATA_DIR_ENV, DEFAULT_WORLD, WorldStore, default_base_dir, list_worlds};
