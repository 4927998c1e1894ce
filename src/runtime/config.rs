use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

pub const DEFAULT_GC_THRESHOLD: usize = 10_000;
pub const MIN_GC_THRESHOLD: usize = 1024;
pub const MAX_GC_THRESHOLD: usize = 1_000_000;

/// Tunable collection and resource limits.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Whether automatic collection at safepoints is allowed.
    pub enabled: bool,
    /// Allocations since the last collection that trigger the next one.
    pub allocation_threshold: usize,
    pub min_threshold: usize,
    pub max_threshold: usize,
    /// Live registry size that triggers a collection regardless of allocations.
    pub registry_threshold: usize,
    /// Grow or shrink the allocation threshold from each collection's yield.
    pub adaptive: bool,
    pub max_memory_bytes: usize,
    /// Size of the object identity space.
    pub max_objects: u32,
    pub max_call_depth: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allocation_threshold: DEFAULT_GC_THRESHOLD,
            min_threshold: MIN_GC_THRESHOLD,
            max_threshold: MAX_GC_THRESHOLD,
            registry_threshold: 100_000,
            adaptive: true,
            max_memory_bytes: 512 * 1024 * 1024,
            max_objects: u32::MAX,
            max_call_depth: 10_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid collector config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GcConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: GcConfig = serde_json::from_str(text)?;
        Ok(config.normalized())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded collector config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Keeps the threshold bounds ordered and the initial threshold inside them.
    pub fn normalized(mut self) -> Self {
        self.min_threshold = self.min_threshold.max(1);
        self.max_threshold = self.max_threshold.max(self.min_threshold);
        self.allocation_threshold = self.allocation_threshold.max(1);
        self.max_call_depth = self.max_call_depth.max(1);
        self
    }
}
