use serde::{Deserialize, Serialize};

use crate::duration::ValidationPolicy;
use crate::sync::{SyncBase, SyncBasis};

/// Tunables of the analysis passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub validation: ValidationPolicy,
    pub rate: RateConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Length of a bitrate/fps window in seconds.
    pub window_seconds: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            window_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base: SyncBase,
    pub basis: SyncBasis,
}
