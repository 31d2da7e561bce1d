//! Store Configuration

use std::path::PathBuf;
use std::time::Duration;

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Private in-memory database (tests, demos)
    Memory,
    /// Database file on disk
    File(PathBuf),
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database location
    pub location: StoreLocation,
    /// Upper bound on any single store operation, including lock wait
    pub op_timeout: Duration,
    /// SQLite busy handler timeout
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::Memory,
            op_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(2),
        }
    }
}

impl StoreConfig {
    /// In-memory configuration
    pub fn memory() -> Self {
        Self::default()
    }

    /// File-backed configuration. `":memory:"` and `"mem://"` select memory.
    pub fn from_url(url: &str) -> Self {
        let location = match url {
            ":memory:" | "mem://" | "" => StoreLocation::Memory,
            other => StoreLocation::File(PathBuf::from(other.trim_start_matches("sqlite://"))),
        };
        Self {
            location,
            ..Self::default()
        }
    }

    /// Set the operation timeout
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.location, StoreLocation::Memory);
        assert_eq!(config.op_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_url() {
        assert_eq!(StoreConfig::from_url("mem://").location, StoreLocation::Memory);
        assert_eq!(
            StoreConfig::from_url("sqlite://data/canvas.db").location,
            StoreLocation::File(PathBuf::from("data/canvas.db"))
        );
    }
}
