//! Engine configuration
//!
//! All settings have defaults that reproduce the standard metric definitions,
//! so an empty document is a valid configuration:
//!
//! ```yaml
//! filter:
//!   require_accurate: true
//!   qualifying_statuses: ["1"]
//! compound_resolution: most_frequent
//! batch:
//!   max_concurrency: 4
//!   source_timeout_ms: 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::types::{LapRecord, TrackStatus};
use crate::{Result, TyrewallError};

/// Which laps feed the degradation statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterPolicy {
    /// Drop laps whose timing is flagged unreliable
    pub require_accurate: bool,
    /// Track statuses under which a lap is representative
    pub qualifying_statuses: Vec<TrackStatus>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self { require_accurate: true, qualifying_statuses: vec![TrackStatus::Green] }
    }
}

impl FilterPolicy {
    /// Whether a lap takes part in the statistics
    pub fn qualifies(&self, lap: &LapRecord) -> bool {
        (!self.require_accurate || lap.is_accurate)
            && self.qualifying_statuses.contains(&lap.track_status)
    }
}

/// How to pick a stint's compound when its laps disagree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundResolution {
    /// Most laps wins; ties go to the compound seen last
    #[default]
    MostFrequent,
    /// Compound of the latest lap
    LastObserved,
}

/// Batch driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Driver/race units processed at once
    pub max_concurrency: usize,
    /// Upper bound on a single lap store or weather request
    pub source_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 4, source_timeout_ms: 5_000 }
    }
}

impl BatchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub filter: FilterPolicy,
    pub compound_resolution: CompoundResolution,
    pub batch: BatchConfig,
}

impl EngineConfig {
    /// Parse and validate a YAML document
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)
                .map_err(|e| TyrewallError::config("EngineConfig deserialization", e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine config from {}", path.display());
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| TyrewallError::ConfigFile { path: path.to_path_buf(), source })?;
        Self::parse(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filter.qualifying_statuses.is_empty() {
            return Err(TyrewallError::config("filter", "qualifying_statuses is empty"));
        }
        if self.batch.max_concurrency == 0 {
            return Err(TyrewallError::config("batch", "max_concurrency must be at least 1"));
        }
        if self.batch.source_timeout_ms == 0 {
            return Err(TyrewallError::config("batch", "source_timeout_ms must be positive"));
        }
        Ok(())
    }
}
