//! Computed stint summaries

use serde::{Deserialize, Serialize};

use super::{CompoundId, StintKey};

/// Data-quality finding attached to a stint metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StintAnomaly {
    /// More than one compound recorded inside one stint
    MixedCompounds { observed: Vec<CompoundId>, selected: CompoundId },
    /// The stint window spans more lap numbers than there are lap records
    MissingLaps { expected: u32, recorded: u32 },
    /// No lap passed the accuracy/track-status filter
    NoQualifyingLaps,
}

/// Degradation summary for one stint, unique on its [`StintKey`].
///
/// Statistical fields are `None` when they are undefined for the filtered
/// lap set (no qualifying laps, or a single lap for `degradation_rate`).
/// Rows are only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StintMetric {
    pub key: StintKey,
    pub compound_id: Option<CompoundId>,
    pub stint_start_lap: u32,
    pub stint_end_lap: u32,
    /// Structural lap count of the stint window, independent of filtering
    pub total_laps: u32,
    /// Laps that passed the filter and feed the statistics
    pub qualifying_laps: u32,
    pub first_lap_time_seconds: Option<f64>,
    pub last_lap_time_seconds: Option<f64>,
    pub avg_lap_time_seconds: Option<f64>,
    pub median_lap_time_seconds: Option<f64>,
    pub fastest_lap_time_seconds: Option<f64>,
    /// Seconds lost per lap: `(max - min) / (count - 1)`
    pub degradation_rate: Option<f64>,
    /// `max - min` over the filtered laps
    pub total_time_loss: Option<f64>,
    pub avg_track_temp: Option<f64>,
    pub avg_air_temp: Option<f64>,
    #[serde(default)]
    pub anomalies: Vec<StintAnomaly>,
}

impl StintMetric {
    /// Last minus first qualifying lap time
    pub fn time_delta(&self) -> Option<f64> {
        Some(self.last_lap_time_seconds? - self.first_lap_time_seconds?)
    }

    /// Degradation rate scaled to the whole stint
    pub fn calculated_time_loss(&self) -> Option<f64> {
        self.degradation_rate.map(|rate| rate * self.total_laps as f64)
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }

    pub fn has_mixed_compounds(&self) -> bool {
        self.anomalies.iter().any(|a| matches!(a, StintAnomaly::MixedCompounds { .. }))
    }
}
