//! Per-lap observations

use serde::{Deserialize, Serialize};

use super::{CompoundId, DriverId, RaceId, TrackStatus};
use crate::{Result, TyrewallError};

/// One observation of a driver on a lap within a race.
///
/// Unique on `(race_id, driver_id, lap_number)` and never mutated once
/// recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    /// 1-based lap number within the race
    pub lap_number: u32,
    pub lap_time_seconds: f64,
    #[serde(default)]
    pub sector1_time_seconds: Option<f64>,
    #[serde(default)]
    pub sector2_time_seconds: Option<f64>,
    #[serde(default)]
    pub sector3_time_seconds: Option<f64>,
    #[serde(default)]
    pub compound_id: Option<CompoundId>,
    /// Laps accumulated on the fitted tyre set at this lap
    #[serde(default)]
    pub tyre_life: Option<u32>,
    /// 1-based stint counter, non-decreasing over the race
    pub stint_number: u32,
    #[serde(default)]
    pub fresh_tyre: bool,
    #[serde(default)]
    pub track_status: TrackStatus,
    #[serde(default)]
    pub is_personal_best: bool,
    /// Whether the timing for this lap is considered reliable
    #[serde(default = "default_accurate")]
    pub is_accurate: bool,
    #[serde(default)]
    pub position: Option<u32>,
}

fn default_accurate() -> bool {
    true
}

impl LapRecord {
    /// Create an accurate green-flag lap with no optional data.
    pub fn new(
        race_id: RaceId,
        driver_id: DriverId,
        lap_number: u32,
        lap_time_seconds: f64,
        stint_number: u32,
    ) -> Self {
        Self {
            race_id,
            driver_id,
            lap_number,
            lap_time_seconds,
            sector1_time_seconds: None,
            sector2_time_seconds: None,
            sector3_time_seconds: None,
            compound_id: None,
            tyre_life: None,
            stint_number,
            fresh_tyre: false,
            track_status: TrackStatus::Green,
            is_personal_best: false,
            is_accurate: true,
            position: None,
        }
    }

    /// Sum of the three sector times when all are present
    pub fn sector_sum(&self) -> Option<f64> {
        Some(self.sector1_time_seconds? + self.sector2_time_seconds? + self.sector3_time_seconds?)
    }

    /// Check field-level constraints.
    pub fn validate(&self) -> Result<()> {
        if self.lap_number == 0 {
            return Err(self.invalid("lap number must start at 1"));
        }
        if self.stint_number == 0 {
            return Err(self.invalid("stint number must start at 1"));
        }
        if !self.lap_time_seconds.is_finite() || self.lap_time_seconds <= 0.0 {
            return Err(self.invalid(format!("lap time {} is not positive", self.lap_time_seconds)));
        }

        let sectors = [
            ("sector 1", self.sector1_time_seconds),
            ("sector 2", self.sector2_time_seconds),
            ("sector 3", self.sector3_time_seconds),
        ];
        for (name, time) in sectors {
            if let Some(time) = time {
                if !time.is_finite() || time <= 0.0 {
                    return Err(self.invalid(format!("{} time {} is not positive", name, time)));
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> TyrewallError {
        TyrewallError::invalid_lap(self.race_id, self.driver_id, self.lap_number, reason)
    }
}
