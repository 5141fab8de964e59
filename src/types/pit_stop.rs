//! Pit stop records

use serde::{Deserialize, Serialize};

use super::{DriverId, RaceId};
use crate::{Result, TyrewallError};

/// A pit stop made at the end of `lap_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitStop {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    pub lap_number: u32,
    /// 1-based stop counter for the driver in this race
    pub stop_number: u32,
    pub duration_seconds: f64,
}

impl PitStop {
    pub fn validate(&self) -> Result<()> {
        if self.lap_number == 0 || self.stop_number == 0 {
            return Err(TyrewallError::InvalidPitStop {
                reason: format!(
                    "lap {} / stop {} must both start at 1",
                    self.lap_number, self.stop_number
                ),
            });
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(TyrewallError::InvalidPitStop {
                reason: format!("duration {} is not positive", self.duration_seconds),
            });
        }
        Ok(())
    }
}
