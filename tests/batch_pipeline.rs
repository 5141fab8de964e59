//! Batch recompute against in-memory and failing sources and stores

use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tyrewall::sources::MemoryLapSource;
use tyrewall::store::{MemoryMetricsStore, MetricsStore};
use tyrewall::{
    BatchDriver, DriverId, DriverRaceKey, EngineConfig, LapRecord, LapSource, RaceId, Result,
    StintKey, StintMetric, TyrewallError, UnitOutcome, WeatherSample,
};

const RACE: RaceId = RaceId(7);

/// `stints` stints of `laps_per_stint` laps each, slowing 0.1s per lap.
fn driver_laps(driver: DriverId, stints: u32, laps_per_stint: u32) -> Vec<LapRecord> {
    (0..stints * laps_per_stint)
        .map(|i| {
            let tyre_age = i % laps_per_stint;
            let lap_time = 95.0 + 0.1 * tyre_age as f64;
            LapRecord::new(RACE, driver, i + 1, lap_time, i / laps_per_stint + 1)
        })
        .collect()
}

fn grid(drivers: u32) -> MemoryLapSource {
    let mut source = MemoryLapSource::new();
    for driver in 1..=drivers {
        source.extend_laps(driver_laps(DriverId(driver), 3, 6));
    }
    source.extend_weather((1..=18).map(|lap| WeatherSample::new(RACE, lap).with_temps(21.0, 30.0)));
    source
}

/// Store that rejects every write after the first `accept` ones
#[derive(Default)]
struct FlakyStore {
    inner: MemoryMetricsStore,
    accept: usize,
    writes: AtomicUsize,
}

#[async_trait::async_trait]
impl MetricsStore for FlakyStore {
    async fn upsert(&self, metric: StintMetric) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.accept {
            return Err(TyrewallError::Store { reason: "disk full".into() });
        }
        self.inner.upsert(metric).await
    }

    async fn get(&self, key: &StintKey) -> Result<Option<Arc<StintMetric>>> {
        self.inner.get(key).await
    }

    async fn metrics_for(&self, key: DriverRaceKey) -> Result<Vec<Arc<StintMetric>>> {
        self.inner.metrics_for(key).await
    }
}

/// Source whose lap fetch never completes
struct HangingSource;

#[async_trait::async_trait]
impl LapSource for HangingSource {
    async fn driver_races(&self) -> Result<Vec<DriverRaceKey>> {
        Ok(vec![DriverRaceKey::new(RACE, DriverId(1))])
    }

    async fn laps(&self, _key: DriverRaceKey) -> Result<Vec<LapRecord>> {
        futures::future::pending().await
    }

    async fn weather(&self, _race_id: RaceId) -> Result<Vec<WeatherSample>> {
        Ok(Vec::new())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_grid_recompute_is_idempotent() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let source = Arc::new(grid(20));
    let store = Arc::new(MemoryMetricsStore::new());

    let first =
        BatchDriver::run_all(Arc::clone(&source), Arc::clone(&store), EngineConfig::default())
            .await?;
    let before = store.snapshot().await;
    let second =
        BatchDriver::run_all(Arc::clone(&source), Arc::clone(&store), EngineConfig::default())
            .await?;
    let after = store.snapshot().await;

    assert!(first.all_completed() && second.all_completed());
    assert_eq!(first.stints_written(), 60);
    assert_eq!(before.len(), 60);
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(a, b)| **a == **b));

    let metric = store.get(&StintKey::new(RACE, DriverId(5), 2)).await?.expect("stint 2 stored");
    assert_eq!((metric.stint_start_lap, metric.stint_end_lap), (7, 12));
    assert!((metric.degradation_rate.unwrap_or_default() - 0.1).abs() < 1e-9);
    assert_eq!(metric.avg_track_temp, Some(30.0));
    Ok(())
}

#[tokio::test]
async fn store_failure_stops_only_its_unit() -> anyhow::Result<()> {
    let source = Arc::new(grid(1));
    let store = Arc::new(FlakyStore { accept: 2, ..FlakyStore::default() });

    let report = BatchDriver::run_all(source, Arc::clone(&store), EngineConfig::default()).await?;
    let key = DriverRaceKey::new(RACE, DriverId(1));

    match report.outcome(&key) {
        Some(UnitOutcome::Failed { error: TyrewallError::Store { .. }, stints }) => {
            assert_eq!(*stints, 2)
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.retryable(), vec![key]);
    assert_eq!(store.metrics_for(key).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn hanging_source_times_out() -> anyhow::Result<()> {
    let config = EngineConfig::parse("batch:\n  source_timeout_ms: 20\n")?;
    let store = Arc::new(MemoryMetricsStore::new());

    let report = BatchDriver::run_all(Arc::new(HangingSource), Arc::clone(&store), config).await?;

    let (_, error) = report.failed().next().expect("one failed unit");
    assert!(matches!(error, TyrewallError::SourceTimeout { .. }));
    assert!(error.is_retryable());
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn listing_from_unavailable_source_fails_fast() {
    let source = Arc::new(grid(2));
    source.set_available(false);

    let store = Arc::new(MemoryMetricsStore::new());
    let err = BatchDriver::run_all(source, store, EngineConfig::default()).await.unwrap_err();
    assert!(matches!(err, TyrewallError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_work() {
    let mut config = EngineConfig::default();
    config.batch.max_concurrency = 0;

    let err = BatchDriver::run_all(Arc::new(grid(1)), Arc::new(MemoryMetricsStore::new()), config)
        .await
        .unwrap_err();
    assert!(matches!(err, TyrewallError::Config { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn progress_stream_ends_with_final_totals() -> anyhow::Result<()> {
    let source = Arc::new(grid(6));
    let units = source.driver_races().await?;
    let store = Arc::new(MemoryMetricsStore::new());
    let handle = BatchDriver::spawn(source, store, EngineConfig::default(), units);

    let updates: Vec<_> = handle.progress_updates().collect().await;
    let report = handle.join().await?;

    let last = updates.last().copied().unwrap_or_default();
    assert!(last.is_done());
    assert_eq!(last.completed, 6);
    assert_eq!(last.stints_written, 18);
    assert!(updates.windows(2).all(|w| w[0].finished_units() <= w[1].finished_units()));
    assert_eq!(report.len(), 6);
    Ok(())
}
