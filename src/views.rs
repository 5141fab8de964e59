//! Denormalised lap and stint views
//!
//! Joins computed rows with reference data, weather and pit stops into flat
//! records for reporting. All joins are outer joins: a missing reference row
//! leaves the corresponding fields `None` and never fails the view.

use serde::Serialize;

use crate::reference::ReferenceData;
use crate::types::{
    CompoundId, DriverId, LapRecord, PitStop, RaceId, StintAnomaly, StintMetric, TrackStatus,
    WeatherIndex,
};

/// Race, circuit, driver and team names shared by both views
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaceContext {
    pub race_name: Option<String>,
    pub year: Option<u16>,
    pub round: Option<u32>,
    pub circuit_name: Option<String>,
    pub country: Option<String>,
    pub driver_code: Option<String>,
    pub driver_name: Option<String>,
    pub team_name: Option<String>,
}

impl RaceContext {
    pub fn resolve(reference: &ReferenceData, race_id: RaceId, driver_id: DriverId) -> Self {
        let race = reference.race(race_id);
        let circuit = reference.circuit_for_race(race_id);
        let driver = reference.driver(driver_id);
        Self {
            race_name: race.map(|r| r.name.clone()),
            year: race.map(|r| r.year),
            round: race.map(|r| r.round),
            circuit_name: circuit.map(|c| c.name.clone()),
            country: circuit.and_then(|c| c.country.clone()),
            driver_code: driver.map(|d| d.code.clone()),
            driver_name: driver.map(|d| d.full_name.clone()),
            team_name: reference.team_for_driver(driver_id).map(|t| t.name.clone()),
        }
    }
}

/// One lap with its race context and weather reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapView {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    pub lap_number: u32,
    #[serde(flatten)]
    pub context: RaceContext,
    pub lap_time_seconds: f64,
    pub sector1_time_seconds: Option<f64>,
    pub sector2_time_seconds: Option<f64>,
    pub sector3_time_seconds: Option<f64>,
    pub compound_id: Option<CompoundId>,
    pub compound_name: Option<String>,
    pub tyre_life: Option<u32>,
    pub stint_number: u32,
    pub fresh_tyre: bool,
    pub track_status: TrackStatus,
    pub is_personal_best: bool,
    pub position: Option<u32>,
    pub air_temp_celsius: Option<f64>,
    pub track_temp_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub rainfall: Option<bool>,
}

/// One stint metric with its race context and the pit stop that ended it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StintView {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    pub stint_number: u32,
    #[serde(flatten)]
    pub context: RaceContext,
    pub compound_id: Option<CompoundId>,
    pub compound_name: Option<String>,
    pub stint_start_lap: u32,
    pub stint_end_lap: u32,
    pub total_laps: u32,
    pub qualifying_laps: u32,
    pub first_lap_time_seconds: Option<f64>,
    pub last_lap_time_seconds: Option<f64>,
    pub avg_lap_time_seconds: Option<f64>,
    pub median_lap_time_seconds: Option<f64>,
    pub fastest_lap_time_seconds: Option<f64>,
    pub degradation_rate: Option<f64>,
    pub total_time_loss: Option<f64>,
    pub time_delta: Option<f64>,
    pub calculated_time_loss: Option<f64>,
    pub avg_track_temp: Option<f64>,
    pub avg_air_temp: Option<f64>,
    /// Stop made at the end of the stint's last lap; `None` for the final stint
    pub pit_stop_number: Option<u32>,
    pub pit_stop_duration_seconds: Option<f64>,
    pub anomalies: Vec<StintAnomaly>,
}

/// Build the lap-level view.
pub fn lap_view(lap: &LapRecord, reference: &ReferenceData, weather: &WeatherIndex) -> LapView {
    let sample = weather.get(lap.race_id, lap.lap_number);
    LapView {
        race_id: lap.race_id,
        driver_id: lap.driver_id,
        lap_number: lap.lap_number,
        context: RaceContext::resolve(reference, lap.race_id, lap.driver_id),
        lap_time_seconds: lap.lap_time_seconds,
        sector1_time_seconds: lap.sector1_time_seconds,
        sector2_time_seconds: lap.sector2_time_seconds,
        sector3_time_seconds: lap.sector3_time_seconds,
        compound_id: lap.compound_id,
        compound_name: compound_name(reference, lap.compound_id),
        tyre_life: lap.tyre_life,
        stint_number: lap.stint_number,
        fresh_tyre: lap.fresh_tyre,
        track_status: lap.track_status.clone(),
        is_personal_best: lap.is_personal_best,
        position: lap.position,
        air_temp_celsius: sample.and_then(|s| s.air_temp_celsius),
        track_temp_celsius: sample.and_then(|s| s.track_temp_celsius),
        humidity_percent: sample.and_then(|s| s.humidity_percent),
        rainfall: sample.map(|s| s.rainfall),
    }
}

/// Build the stint-level view.
///
/// `pit_stops` may hold stops for any driver or race; only the stop made by
/// the metric's driver on the stint's last lap is attached.
pub fn stint_view(
    metric: &StintMetric,
    reference: &ReferenceData,
    pit_stops: &[PitStop],
) -> StintView {
    let key = metric.key;
    let pit_stop = pit_stops.iter().find(|stop| {
        stop.race_id == key.race_id
            && stop.driver_id == key.driver_id
            && stop.lap_number == metric.stint_end_lap
    });

    StintView {
        race_id: key.race_id,
        driver_id: key.driver_id,
        stint_number: key.stint_number,
        context: RaceContext::resolve(reference, key.race_id, key.driver_id),
        compound_id: metric.compound_id,
        compound_name: compound_name(reference, metric.compound_id),
        stint_start_lap: metric.stint_start_lap,
        stint_end_lap: metric.stint_end_lap,
        total_laps: metric.total_laps,
        qualifying_laps: metric.qualifying_laps,
        first_lap_time_seconds: metric.first_lap_time_seconds,
        last_lap_time_seconds: metric.last_lap_time_seconds,
        avg_lap_time_seconds: metric.avg_lap_time_seconds,
        median_lap_time_seconds: metric.median_lap_time_seconds,
        fastest_lap_time_seconds: metric.fastest_lap_time_seconds,
        degradation_rate: metric.degradation_rate,
        total_time_loss: metric.total_time_loss,
        time_delta: metric.time_delta(),
        calculated_time_loss: metric.calculated_time_loss(),
        avg_track_temp: metric.avg_track_temp,
        avg_air_temp: metric.avg_air_temp,
        pit_stop_number: pit_stop.map(|s| s.stop_number),
        pit_stop_duration_seconds: pit_stop.map(|s| s.duration_seconds),
        anomalies: metric.anomalies.clone(),
    }
}

fn compound_name(reference: &ReferenceData, id: Option<CompoundId>) -> Option<String> {
    id.and_then(|id| reference.compound_name(id)).map(str::to_owned)
}
