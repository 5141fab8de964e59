//! Source trait for lap and weather data

use crate::Result;
use crate::types::{DriverRaceKey, LapRecord, RaceId, WeatherSample};

/// Read access to the lap record store and its weather join.
///
/// Sources abstract over where telemetry lives (database, files, memory).
/// Implementations must fail fast when the backing store is unavailable;
/// retrying is the caller's job.
#[async_trait::async_trait]
pub trait LapSource: Send + Sync + 'static {
    /// Driver/race units with at least one lap recorded
    async fn driver_races(&self) -> Result<Vec<DriverRaceKey>>;

    /// All laps of one driver in one race, in any order
    ///
    /// Returns an empty list when the unit has no laps.
    async fn laps(&self, key: DriverRaceKey) -> Result<Vec<LapRecord>>;

    /// Weather samples for a race, possibly incomplete or empty
    async fn weather(&self, race_id: RaceId) -> Result<Vec<WeatherSample>>;
}
