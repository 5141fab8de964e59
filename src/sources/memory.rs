//! In-memory lap source

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

use crate::source::LapSource;
use crate::types::{DriverRaceKey, LapRecord, RaceId, WeatherSample};
use crate::{Result, TyrewallError};

/// Lap source backed by in-memory collections.
///
/// Useful for batch jobs that have already loaded their input, and for
/// tests. Availability can be toggled to exercise fail-fast paths.
#[derive(Debug)]
pub struct MemoryLapSource {
    laps: BTreeMap<DriverRaceKey, Vec<LapRecord>>,
    weather: HashMap<RaceId, Vec<WeatherSample>>,
    available: AtomicBool,
}

impl Default for MemoryLapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLapSource {
    pub fn new() -> Self {
        Self { laps: BTreeMap::new(), weather: HashMap::new(), available: AtomicBool::new(true) }
    }

    /// Build from flat lap and weather collections, grouping laps per driver/race.
    pub fn from_records<L, W>(laps: L, weather: W) -> Self
    where
        L: IntoIterator<Item = LapRecord>,
        W: IntoIterator<Item = WeatherSample>,
    {
        let mut source = Self::new();
        source.extend_laps(laps);
        source.extend_weather(weather);
        source
    }

    pub fn extend_laps<L: IntoIterator<Item = LapRecord>>(&mut self, laps: L) {
        for lap in laps {
            let key = DriverRaceKey::new(lap.race_id, lap.driver_id);
            self.laps.entry(key).or_default().push(lap);
        }
    }

    pub fn extend_weather<W: IntoIterator<Item = WeatherSample>>(&mut self, weather: W) {
        for sample in weather {
            self.weather.entry(sample.race_id).or_default().push(sample);
        }
    }

    /// Simulate the backing store going down or coming back
    pub fn set_available(&self, available: bool) {
        debug!(available, "Memory lap source availability changed");
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self, what: &str) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TyrewallError::source_unavailable(what, "memory source marked unavailable"))
        }
    }
}

#[async_trait::async_trait]
impl LapSource for MemoryLapSource {
    async fn driver_races(&self) -> Result<Vec<DriverRaceKey>> {
        self.ensure_available("lap store")?;
        Ok(self.laps.keys().copied().collect())
    }

    async fn laps(&self, key: DriverRaceKey) -> Result<Vec<LapRecord>> {
        self.ensure_available("lap store")?;
        let laps = self.laps.get(&key).cloned().unwrap_or_default();
        trace!(%key, laps = laps.len(), "Serving laps");
        Ok(laps)
    }

    async fn weather(&self, race_id: RaceId) -> Result<Vec<WeatherSample>> {
        self.ensure_available("weather join")?;
        Ok(self.weather.get(&race_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DriverId;

    #[tokio::test]
    async fn groups_laps_per_driver_race() {
        let laps = vec![
            LapRecord::new(RaceId(1), DriverId(1), 1, 90.0, 1),
            LapRecord::new(RaceId(1), DriverId(2), 1, 91.0, 1),
            LapRecord::new(RaceId(1), DriverId(1), 2, 90.5, 1),
        ];
        let source = MemoryLapSource::from_records(laps, vec![WeatherSample::new(RaceId(1), 1)]);

        let units = source.driver_races().await.unwrap();
        assert_eq!(
            units,
            vec![
                DriverRaceKey::new(RaceId(1), DriverId(1)),
                DriverRaceKey::new(RaceId(1), DriverId(2)),
            ]
        );
        assert_eq!(source.laps(units[0]).await.unwrap().len(), 2);
        assert_eq!(source.weather(RaceId(1)).await.unwrap().len(), 1);
        assert!(source.weather(RaceId(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_source_fails_fast() {
        let source = MemoryLapSource::new();
        source.set_available(false);

        let err = source.laps(DriverRaceKey::new(RaceId(1), DriverId(1))).await.unwrap_err();
        assert!(matches!(err, TyrewallError::SourceUnavailable { .. }));
        assert!(err.is_retryable());

        source.set_available(true);
        assert!(source.driver_races().await.unwrap().is_empty());
    }
}
