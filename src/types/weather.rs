//! Per-lap weather readings and the lap/weather join

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::RaceId;

/// Environmental reading for one lap of a race, unique on `(race_id, lap_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub race_id: RaceId,
    pub lap_number: u32,
    #[serde(default)]
    pub air_temp_celsius: Option<f64>,
    #[serde(default)]
    pub track_temp_celsius: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<f64>,
    #[serde(default)]
    pub rainfall: bool,
    #[serde(default)]
    pub wind_speed_kmh: Option<f64>,
    #[serde(default)]
    pub wind_direction_degrees: Option<f64>,
}

impl WeatherSample {
    pub fn new(race_id: RaceId, lap_number: u32) -> Self {
        Self {
            race_id,
            lap_number,
            air_temp_celsius: None,
            track_temp_celsius: None,
            humidity_percent: None,
            rainfall: false,
            wind_speed_kmh: None,
            wind_direction_degrees: None,
        }
    }

    /// Set air and track temperature
    pub fn with_temps(mut self, air: f64, track: f64) -> Self {
        self.air_temp_celsius = Some(air);
        self.track_temp_celsius = Some(track);
        self
    }
}

/// Weather samples indexed by race and lap.
///
/// Lookups have outer-join semantics: a lap without a reading simply has no
/// entry.
#[derive(Debug, Clone, Default)]
pub struct WeatherIndex {
    samples: HashMap<(RaceId, u32), WeatherSample>,
}

impl WeatherIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index; a repeated `(race, lap)` keeps the last sample.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = WeatherSample>,
    {
        let mut index = Self::new();
        for sample in samples {
            index.insert(sample);
        }
        index
    }

    pub fn insert(&mut self, sample: WeatherSample) {
        let key = (sample.race_id, sample.lap_number);
        if self.samples.insert(key, sample).is_some() {
            warn!(race_id = %key.0, lap = key.1, "Duplicate weather sample, keeping the latest");
        }
    }

    pub fn get(&self, race_id: RaceId, lap_number: u32) -> Option<&WeatherSample> {
        self.samples.get(&(race_id, lap_number))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl FromIterator<WeatherSample> for WeatherIndex {
    fn from_iter<T: IntoIterator<Item = WeatherSample>>(iter: T) -> Self {
        Self::from_samples(iter)
    }
}
