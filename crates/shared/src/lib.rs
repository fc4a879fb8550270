// chunknav - Shared Library
// Ambient services used by the navigation crates and tools

pub mod config;
pub mod log;
pub mod util;

/// Default config file name used by the tools
pub const DEFAULT_CONFIG: &str = "chunknav.conf";

/// Environment variable prefix for config overrides
pub const CONFIG_ENV_PREFIX: &str = "ChunkNav_";
