//! Standard paths used by ultradian

use std::path::PathBuf;

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "ULTRADIAN_DATA_DIR";

/// Standard ultradian paths
pub struct Paths {
    /// Data directory (~/.local/share/ultradian)
    pub data: PathBuf,
    /// Config directory (~/.config/ultradian)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("ultradian"),
        };

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ultradian");

        Self { data, config }
    }

    /// Directory holding the persisted key-value blobs
    pub fn store(&self) -> PathBuf {
        self.data.join("store")
    }

    /// Path of the runtime configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}
