//! Configuration sections.
//!
//! ```toml
//! [preview]
//! debounce_ms = 300           # quiet period before a compile fires
//! cooldown_ms = 0             # minimum gap between fired compiles
//! cache_capacity = 256        # decoded pages kept in memory
//!
//! [backend]
//! typst = "typst"             # compiler binary (tilde expanded, PATH lookup)
//! ppi = 144                   # raster resolution
//! timeout_ms = 10000          # bound of every backend call
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gate::GateConfig;

/// `[preview]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub debounce_ms: u64,
    pub cooldown_ms: u64,
    pub cache_capacity: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            cooldown_ms: 0,
            cache_capacity: crate::preview::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl PreviewConfig {
    pub fn gate(&self) -> GateConfig {
        GateConfig::new(
            Duration::from_millis(self.debounce_ms),
            Duration::from_millis(self.cooldown_ms),
        )
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Compiler binary name or path.
    pub typst: String,
    pub ppi: u32,
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            typst: "typst".into(),
            ppi: 144,
            timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
