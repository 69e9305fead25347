//! Runtime configuration for the ultradian front end
//!
//! Timer durations are user settings and live in the key-value store. This
//! file only covers how the process drives the engine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Interval between timer ticks (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound on phase transitions consumed by one tick
    #[serde(default = "default_max_transitions")]
    pub max_transitions: u32,

    /// Ring the terminal bell on phase change
    #[serde(default = "default_terminal_bell")]
    pub terminal_bell: bool,
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_max_transitions() -> u32 {
    1000
}

fn default_terminal_bell() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_transitions: default_max_transitions(),
            terminal_bell: default_terminal_bell(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let mut config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            config.tick_interval_ms = config.tick_interval_ms.max(1);
            config.max_transitions = config.max_transitions.max(1);
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
