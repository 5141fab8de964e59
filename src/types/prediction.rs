//! Contract for tyre prediction rows written by downstream models

use serde::{Deserialize, Serialize};

use super::{CompoundId, DriverId, RaceId};
use crate::{Result, TyrewallError};

/// One model forecast, unique on `(race_id, driver_id, compound_id, predicted_lap)`.
///
/// Produced by prediction consumers from stint metrics; this crate only
/// defines and checks the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TirePrediction {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    pub compound_id: CompoundId,
    pub predicted_lap: u32,
    pub predicted_lap_time: f64,
    pub predicted_degradation_rate: f64,
    /// Model confidence in `[0, 1]`
    pub confidence_score: f64,
    pub model_version: String,
}

impl TirePrediction {
    pub fn key(&self) -> (RaceId, DriverId, CompoundId, u32) {
        (self.race_id, self.driver_id, self.compound_id, self.predicted_lap)
    }

    pub fn validate(&self) -> Result<()> {
        if self.predicted_lap == 0 {
            return Err(invalid("predicted lap must start at 1"));
        }
        if !self.predicted_lap_time.is_finite() || self.predicted_lap_time <= 0.0 {
            return Err(invalid(format!(
                "predicted lap time {} is not positive",
                self.predicted_lap_time
            )));
        }
        if !self.predicted_degradation_rate.is_finite() {
            return Err(invalid("predicted degradation rate is not finite"));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(invalid(format!(
                "confidence score {} outside [0, 1]",
                self.confidence_score
            )));
        }
        if self.model_version.trim().is_empty() {
            return Err(invalid("model version is empty"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> TyrewallError {
    TyrewallError::InvalidPrediction { reason: reason.into() }
}
