//! Error types for stint analytics.
//!
//! Only conditions that abort a unit of work are errors. Data-quality findings
//! (mixed compounds inside a stint, gaps in the lap series, stints without a
//! qualifying lap, missing weather) are carried as values on the resulting
//! [`StintMetric`](crate::StintMetric) instead.
//!
//! ## Error Categories
//!
//! - **Integrity Errors**: malformed stint sequences or invalid lap records.
//!   Fatal for the affected driver/race, never for other drivers.
//! - **Contract Errors**: prediction or pit stop rows that break their contract
//! - **Source Errors**: the lap store or weather join is unavailable or slow
//! - **Store Errors**: the metrics store rejected a write
//! - **Batch Errors**: the batch supervisor task died
//! - **Config Errors**: configuration could not be read or is inconsistent
//!
//! ## Recovery and Retry
//!
//! The engine never retries on its own. Callers use [`TyrewallError::is_retryable`]
//! to decide whether a failed unit is worth resubmitting:
//!
//! ```rust
//! use tyrewall::TyrewallError;
//!
//! let error = TyrewallError::source_unavailable("lap store", "connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::{DriverId, RaceId};

/// Result type alias for analytics operations.
pub type Result<T, E = TyrewallError> = std::result::Result<T, E>;

/// Main error type for analytics operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TyrewallError {
    #[error(
        "Stint sequence broken for race {race_id}, driver {driver_id}, lap {lap_number}: {details}"
    )]
    SegmentationIntegrity {
        race_id: RaceId,
        driver_id: DriverId,
        lap_number: u32,
        details: String,
    },

    #[error("Invalid lap {lap_number} for race {race_id}, driver {driver_id}: {reason}")]
    InvalidLap { race_id: RaceId, driver_id: DriverId, lap_number: u32, reason: String },

    #[error("Invalid tire prediction: {reason}")]
    InvalidPrediction { reason: String },

    #[error("Invalid pit stop: {reason}")]
    InvalidPitStop { reason: String },

    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Source request timed out after {duration:?}")]
    SourceTimeout { duration: Duration },

    #[error("Metrics store error: {reason}")]
    Store { reason: String },

    #[error("Batch task failed: {reason}")]
    Batch { reason: String },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TyrewallError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TyrewallError::SourceUnavailable { .. } => true,
            TyrewallError::SourceTimeout { .. } => true,
            TyrewallError::Store { .. } => true,
            TyrewallError::SegmentationIntegrity { .. } => false,
            TyrewallError::InvalidLap { .. } => false,
            TyrewallError::InvalidPrediction { .. } => false,
            TyrewallError::InvalidPitStop { .. } => false,
            TyrewallError::Batch { .. } => false,
            TyrewallError::Config { .. } => false,
            TyrewallError::ConfigFile { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TyrewallError::SegmentationIntegrity { .. } => vec![
                "Check the stint numbers recorded for this driver",
                "Re-import the race from the telemetry provider",
                "Look for laps attributed to the wrong driver",
            ],
            TyrewallError::InvalidLap { .. } => vec![
                "Drop laps without a recorded lap time",
                "Verify lap and stint numbers start at 1",
                "Check sector times for zero or negative values",
            ],
            TyrewallError::InvalidPrediction { .. } => vec![
                "Clamp confidence scores into [0, 1]",
                "Tag every prediction with a model version",
            ],
            TyrewallError::InvalidPitStop { .. } => vec![
                "Check the pit stop duration is positive",
                "Verify lap and stop numbers start at 1",
            ],
            TyrewallError::SourceUnavailable { .. } => vec![
                "Check the lap store is reachable",
                "Retry the affected driver/race later",
            ],
            TyrewallError::SourceTimeout { .. } => vec![
                "Increase the source timeout",
                "Check lap store load",
                "Retry the affected driver/race later",
            ],
            TyrewallError::Store { .. } => vec![
                "Check the metrics store is writable",
                "Retry the affected stint",
            ],
            TyrewallError::Batch { .. } => vec![
                "Check logs for a panicked unit task",
                "Rerun the batch for the missing units",
            ],
            TyrewallError::Config { .. } => vec![
                "Check configuration values against the documented defaults",
                "Remove unknown keys from the configuration file",
            ],
            TyrewallError::ConfigFile { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for segmentation integrity errors.
    pub fn segmentation(
        race_id: RaceId,
        driver_id: DriverId,
        lap_number: u32,
        details: impl Into<String>,
    ) -> Self {
        TyrewallError::SegmentationIntegrity {
            race_id,
            driver_id,
            lap_number,
            details: details.into(),
        }
    }

    /// Helper constructor for invalid lap errors.
    pub fn invalid_lap(
        race_id: RaceId,
        driver_id: DriverId,
        lap_number: u32,
        reason: impl Into<String>,
    ) -> Self {
        TyrewallError::InvalidLap { race_id, driver_id, lap_number, reason: reason.into() }
    }

    /// Helper constructor for source errors.
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        TyrewallError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Helper constructor for source errors with an underlying cause.
    pub fn source_unavailable_with_source(
        source_name: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TyrewallError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        TyrewallError::Config { context: context.into(), details: details.into() }
    }

    /// Whether this error condemns the unit's input data rather than the environment.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            TyrewallError::SegmentationIntegrity { .. } | TyrewallError::InvalidLap { .. }
        )
    }
}
