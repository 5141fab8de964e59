//! Degradation metrics per stint
//!
//! The calculator turns one [`StintWindow`] into one [`StintMetric`]:
//!
//! ```text
//! window laps ──► filter (accurate + green) ──► L ordered by lap number
//!      │                                          │
//!      ▼                                          ▼
//! structural fields                first / last / avg / median / fastest
//! (start, end, total_laps)         degradation rate, total time loss
//!                                  weather means over L (via WeatherIndex)
//! ```
//!
//! Nothing here fails: undefined statistics come back as `None` and
//! data-quality findings are attached as [`StintAnomaly`] values.
//!
//! [`stint_lap_series`] gives the per-lap view of the same window: each lap's
//! gap to the stint's opening lap and a trailing rolling average. It covers
//! every recorded lap, filtered or not.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::{CompoundResolution, EngineConfig};
use crate::segment::{StintWindow, segment_stints};
use crate::stats;
use crate::types::{
    CompoundId, DriverId, LapRecord, RaceId, StintAnomaly, StintKey, StintMetric, WeatherIndex,
};
use crate::Result;

/// Computes [`StintMetric`] rows from stint windows.
#[derive(Debug, Clone, Default)]
pub struct DegradationCalculator {
    config: EngineConfig,
}

impl DegradationCalculator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the metric row for one stint window.
    pub fn compute(&self, window: &StintWindow, weather: &WeatherIndex) -> StintMetric {
        let key = StintKey::new(window.race_id(), window.driver_id(), window.stint_number());

        // Window laps are already ordered by lap number, so L is too.
        let qualifying: Vec<&LapRecord> =
            window.laps().iter().filter(|lap| self.config.filter.qualifies(lap)).collect();
        let times: Vec<f64> = qualifying.iter().map(|lap| lap.lap_time_seconds).collect();

        let mut anomalies = Vec::new();
        if window.has_gaps() {
            anomalies.push(StintAnomaly::MissingLaps {
                expected: window.span(),
                recorded: window.recorded_laps(),
            });
        }
        if qualifying.is_empty() {
            debug!(%key, laps = window.recorded_laps(), "No qualifying laps in stint");
            anomalies.push(StintAnomaly::NoQualifyingLaps);
        }

        let compound_laps: Vec<&LapRecord> =
            if qualifying.is_empty() { window.laps().iter().collect() } else { qualifying.clone() };
        let compound_id = self.resolve_compound(&key, &compound_laps, &mut anomalies);

        let fastest = stats::min(&times);
        let slowest = stats::max(&times);
        let total_time_loss = fastest.zip(slowest).map(|(lo, hi)| hi - lo);
        let degradation_rate = match total_time_loss {
            Some(loss) if times.len() > 1 => Some(loss / (times.len() - 1) as f64),
            _ => None,
        };

        let avg_track_temp = stats::mean_present(qualifying.iter().map(|lap| {
            weather.get(lap.race_id, lap.lap_number).and_then(|w| w.track_temp_celsius)
        }));
        let avg_air_temp = stats::mean_present(qualifying.iter().map(|lap| {
            weather.get(lap.race_id, lap.lap_number).and_then(|w| w.air_temp_celsius)
        }));

        StintMetric {
            key,
            compound_id,
            stint_start_lap: window.start_lap(),
            stint_end_lap: window.end_lap(),
            total_laps: window.span(),
            qualifying_laps: times.len() as u32,
            first_lap_time_seconds: times.first().copied(),
            last_lap_time_seconds: times.last().copied(),
            avg_lap_time_seconds: stats::mean(&times),
            median_lap_time_seconds: stats::median(&times),
            fastest_lap_time_seconds: fastest,
            degradation_rate,
            total_time_loss,
            avg_track_temp,
            avg_air_temp,
            anomalies,
        }
    }

    /// Segment a driver's race and compute every stint.
    ///
    /// Integrity errors abort the whole driver/race; no partial result is
    /// returned.
    pub fn compute_driver_race(
        &self,
        race_id: RaceId,
        driver_id: DriverId,
        laps: &[LapRecord],
        weather: &WeatherIndex,
    ) -> Result<Vec<StintMetric>> {
        let windows = segment_stints(race_id, driver_id, laps)?;
        Ok(windows.iter().map(|window| self.compute(window, weather)).collect())
    }

    fn resolve_compound(
        &self,
        key: &StintKey,
        laps: &[&LapRecord],
        anomalies: &mut Vec<StintAnomaly>,
    ) -> Option<CompoundId> {
        // compound -> (lap count, index of last lap seen on it)
        let mut seen: BTreeMap<CompoundId, (usize, usize)> = BTreeMap::new();
        let observed = laps.iter().enumerate().filter_map(|(i, l)| Some((i, l.compound_id?)));
        for (index, compound) in observed {
            let entry = seen.entry(compound).or_insert((0, index));
            entry.0 += 1;
            entry.1 = index;
        }

        let selected = match self.config.compound_resolution {
            CompoundResolution::MostFrequent => seen
                .iter()
                .max_by_key(|(_, (count, last))| (*count, *last))
                .map(|(compound, _)| *compound),
            CompoundResolution::LastObserved => {
                seen.iter().max_by_key(|(_, (_, last))| *last).map(|(compound, _)| *compound)
            }
        }?;

        if seen.len() > 1 {
            let observed: Vec<CompoundId> = seen.keys().copied().collect();
            warn!(%key, ?observed, selected = %selected, "Compound changed inside stint");
            anomalies.push(StintAnomaly::MixedCompounds { observed, selected });
        }

        Some(selected)
    }
}

/// Compute all stint metrics for one driver's race with the given configuration.
pub fn compute_driver_race(
    race_id: RaceId,
    driver_id: DriverId,
    laps: &[LapRecord],
    weather: &WeatherIndex,
    config: &EngineConfig,
) -> Result<Vec<StintMetric>> {
    DegradationCalculator::new(config.clone())
        .compute_driver_race(race_id, driver_id, laps, weather)
}

/// Laps averaged by [`StintLapFeatures::lap_time_rolling_avg`]
pub const ROLLING_WINDOW: usize = 3;

/// Per-lap derived values within a stint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StintLapFeatures {
    pub lap_number: u32,
    pub stint_number: u32,
    pub lap_time_seconds: f64,
    /// Time of the window's first recorded lap
    pub stint_first_lap_time: f64,
    /// `lap_time_seconds - stint_first_lap_time`
    pub time_delta_from_first: f64,
    /// Mean of this lap and up to two before it in the same stint
    pub lap_time_rolling_avg: f64,
}

/// Derive per-lap features over every lap of the window, in lap order.
pub fn stint_lap_series(window: &StintWindow) -> Vec<StintLapFeatures> {
    let times: Vec<f64> = window.laps().iter().map(|lap| lap.lap_time_seconds).collect();
    let Some(&first) = times.first() else {
        return Vec::new();
    };
    let rolling = stats::rolling_mean(&times, ROLLING_WINDOW);

    window
        .laps()
        .iter()
        .zip(rolling)
        .map(|(lap, lap_time_rolling_avg)| StintLapFeatures {
            lap_number: lap.lap_number,
            stint_number: lap.stint_number,
            lap_time_seconds: lap.lap_time_seconds,
            stint_first_lap_time: first,
            time_delta_from_first: lap.lap_time_seconds - first,
            lap_time_rolling_avg,
        })
        .collect()
}
