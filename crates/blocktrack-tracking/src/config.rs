//! Engine and tracker configuration files.

use std::path::Path;

use blocktrack_core::{Result, TrackError};
use serde::{Deserialize, Serialize};

use crate::params::TrackerParams;

/// Sizing of the search worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads; 0 uses one per logical CPU.
    pub threads: usize,
    /// Search window rows handed to a worker at a time.
    pub rows_per_task: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            rows_per_task: 4,
        }
    }
}

impl EngineConfig {
    /// Resolved number of worker threads.
    pub fn thread_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_task == 0 {
            return Err(TrackError::InvalidParameter(
                "rows_per_task must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a tracking run is configured with, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub params: TrackerParams,
    pub engine: EngineConfig,
}

impl TrackerConfig {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| TrackError::Serialization(format!("Invalid tracker config: {}", e)))?;
        config.params.validate()?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| TrackError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
