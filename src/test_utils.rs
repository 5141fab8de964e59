//! Test utilities for building lap fixtures
//!
//! Shared by unit tests and the benchmarks. Fixtures are deterministic so
//! metric comparisons stay exact across runs.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::{CompoundId, DriverId, LapRecord, RaceId, WeatherSample};

/// Race used by single-race fixtures
pub const RACE: RaceId = RaceId(1001);

/// Driver used by single-driver fixtures
pub const DRIVER: DriverId = DriverId(44);

/// Lap time used when a fixture only cares about stint numbering
pub const BASE_LAP_TIME: f64 = 92.5;

/// An accurate green-flag lap for the default race and driver.
pub fn lap_with_stint(lap_number: u32, stint_number: u32) -> LapRecord {
    LapRecord::new(RACE, DRIVER, lap_number, BASE_LAP_TIME, stint_number)
}

/// Laps numbered from 1 carrying the given stint numbers in order.
pub fn laps_from_stints(stints: &[u32]) -> Vec<LapRecord> {
    stints.iter().enumerate().map(|(i, &stint)| lap_with_stint(i as u32 + 1, stint)).collect()
}

/// Consecutive laps of one stint starting at `start_lap` with the given times.
pub fn stint_laps(start_lap: u32, stint_number: u32, times: &[f64]) -> Vec<LapRecord> {
    times
        .iter()
        .enumerate()
        .map(|(i, &time)| {
            let mut lap = lap_with_stint(start_lap + i as u32, stint_number);
            lap.lap_time_seconds = time;
            lap.tyre_life = Some(i as u32 + 1);
            lap.fresh_tyre = i == 0;
            lap
        })
        .collect()
}

/// A full synthetic race for one driver.
///
/// Each entry of `stint_lengths` becomes one stint on its own compound with a
/// linear wear trend plus a small deterministic wobble. Every seventh lap is
/// run under yellow flags.
pub fn synthetic_race(
    race_id: RaceId,
    driver_id: DriverId,
    stint_lengths: &[u32],
) -> Vec<LapRecord> {
    let mut laps = Vec::new();
    let mut lap_number = 1;

    for (stint_index, &length) in stint_lengths.iter().enumerate() {
        let stint_number = stint_index as u32 + 1;
        let wear_per_lap = 0.04 + 0.02 * stint_index as f64;
        for tyre_life in 1..=length {
            let wobble = ((lap_number * 37 + driver_id.0 * 11) % 17) as f64 / 100.0;
            let mut lap = LapRecord::new(
                race_id,
                driver_id,
                lap_number,
                BASE_LAP_TIME + wear_per_lap * tyre_life as f64 + wobble,
                stint_number,
            );
            lap.compound_id = Some(CompoundId(stint_index as u32 % 3 + 1));
            lap.tyre_life = Some(tyre_life);
            lap.fresh_tyre = tyre_life == 1;
            if lap_number % 7 == 0 {
                lap.track_status = crate::types::TrackStatus::Yellow;
            }
            laps.push(lap);
            lap_number += 1;
        }
    }

    laps
}

/// One weather sample per lap with slowly rising temperatures.
pub fn synthetic_weather(race_id: RaceId, laps: u32) -> Vec<WeatherSample> {
    (1..=laps)
        .map(|lap| {
            WeatherSample::new(race_id, lap)
                .with_temps(24.0 + lap as f64 * 0.02, 38.0 + lap as f64 * 0.05)
        })
        .collect()
}
