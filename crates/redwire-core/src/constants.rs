/// Strongest redstone signal a node can carry or emit.
pub const MAX_SIGNAL: u8 = 15;

/// Default maximum Euclidean distance (in blocks) between two connected chains.
pub const DEFAULT_MAX_CONNECTION_DISTANCE: u32 = 24;

/// Default cap on connections held by a single chain.
pub const DEFAULT_MAX_CONNECTIONS_PER_CHAIN: usize = 5;

/// Default backstop interval: every node is re-evaluated this often (20 ticks = 1 second).
pub const DEFAULT_UPDATE_INTERVAL_TICKS: u32 = 20;

/// Default debounce before a lost signal is actually cleared.
pub const DEFAULT_SIGNAL_LOSS_DELAY_TICKS: u32 = 1;

/// Host simulation rate used by the CLI tick loop.
pub const TICKS_PER_SECOND: u32 = 20;
