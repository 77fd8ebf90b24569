//! Constants used throughout kvt.
//!
//! Centralizes magic strings and configuration values.

/// Directory under the platform config dir holding kvt files.
pub const CONFIG_DIR: &str = "kvt";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// README written next to the config file on first run.
pub const README_FILE: &str = "README.md";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "KVT_CONFIG";

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "KVT_LOG";

/// Default per-call store timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of commit units in flight.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Name of the Azure CLI binary used by the live backend.
pub const AZ_BINARY: &str = "az";

/// Prefix marking reserved (ignored) project and environment tables.
pub const RESERVED_PREFIX: char = '_';
