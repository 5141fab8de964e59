//! Batch driver that recomputes stint metrics per driver/race
//!
//! Every [`DriverRaceKey`] is one unit of work: fetch laps and weather,
//! segment, then compute and upsert stint by stint. Units run concurrently
//! up to `batch.max_concurrency`. A failing unit never affects another.
//! Cancellation is honoured between stints, never inside one. Nothing is
//! retried here; failed units come back in the [`BatchReport`] for the caller
//! to resubmit.

use futures::{FutureExt, Stream};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::metrics::DegradationCalculator;
use crate::segment::segment_stints;
use crate::source::LapSource;
use crate::store::MetricsStore;
use crate::types::{DriverRaceKey, WeatherIndex};
use crate::{Result, TyrewallError};

/// How one driver/race unit ended
#[derive(Debug)]
pub enum UnitOutcome {
    /// Every stint was computed and written
    Completed { stints: usize },
    /// The unit stopped on an error; `stints` rows were written before it
    Failed { error: TyrewallError, stints: usize },
    /// The batch was cancelled before the unit finished
    Cancelled { stints: usize },
}

impl UnitOutcome {
    /// Rows written by the unit
    pub fn stints(&self) -> usize {
        match self {
            UnitOutcome::Completed { stints }
            | UnitOutcome::Failed { stints, .. }
            | UnitOutcome::Cancelled { stints } => *stints,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, UnitOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&TyrewallError> {
        match self {
            UnitOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Running totals published while a batch is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub total_units: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub stints_written: usize,
}

impl BatchProgress {
    fn new(total_units: usize) -> Self {
        Self { total_units, ..Self::default() }
    }

    fn record(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Completed { .. } => self.completed += 1,
            UnitOutcome::Failed { .. } => self.failed += 1,
            UnitOutcome::Cancelled { .. } => self.cancelled += 1,
        }
        self.stints_written += outcome.stints();
    }

    pub fn finished_units(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }

    pub fn is_done(&self) -> bool {
        self.finished_units() >= self.total_units
    }
}

/// Final per-unit outcomes of a batch
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: BTreeMap<DriverRaceKey, UnitOutcome>,
}

impl BatchReport {
    fn record(&mut self, key: DriverRaceKey, outcome: UnitOutcome) {
        self.outcomes.insert(key, outcome);
    }

    pub fn outcome(&self, key: &DriverRaceKey) -> Option<&UnitOutcome> {
        self.outcomes.get(key)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&DriverRaceKey, &UnitOutcome)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Units that ended in an error
    pub fn failed(&self) -> impl Iterator<Item = (&DriverRaceKey, &TyrewallError)> {
        self.outcomes.iter().filter_map(|(key, outcome)| outcome.error().map(|e| (key, e)))
    }

    /// Failed units worth resubmitting
    pub fn retryable(&self) -> Vec<DriverRaceKey> {
        self.failed().filter(|(_, e)| e.is_retryable()).map(|(key, _)| *key).collect()
    }

    pub fn stints_written(&self) -> usize {
        self.outcomes.values().map(UnitOutcome::stints).sum()
    }

    pub fn all_completed(&self) -> bool {
        self.outcomes.values().all(UnitOutcome::is_completed)
    }
}

/// Handle to a running batch
pub struct BatchHandle {
    /// Receiver for progress totals
    pub progress: watch::Receiver<BatchProgress>,
    /// Cancellation token; cancelling stops units at their next stint boundary
    pub cancel: CancellationToken,
    join: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// Progress totals as a stream, starting with the current value
    pub fn progress_updates(&self) -> impl Stream<Item = BatchProgress> + use<> {
        WatchStream::new(self.progress.clone())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for every unit to finish
    pub async fn join(self) -> Result<BatchReport> {
        self.join.await.map_err(|e| TyrewallError::Batch { reason: e.to_string() })
    }
}

/// Spawns and supervises batch recomputation tasks
pub struct BatchDriver;

impl BatchDriver {
    /// Spawn a batch over the given units.
    ///
    /// An invalid `config` fails every unit with its configuration error
    /// before anything is fetched or written. Must be called from within a
    /// Tokio runtime.
    pub fn spawn<S, M>(
        source: Arc<S>,
        store: Arc<M>,
        config: EngineConfig,
        units: Vec<DriverRaceKey>,
    ) -> BatchHandle
    where
        S: LapSource + ?Sized,
        M: MetricsStore + ?Sized,
    {
        let (progress_tx, progress_rx) = watch::channel(BatchProgress::new(units.len()));
        let cancel = CancellationToken::new();
        let cancel_batch = cancel.clone();

        let join = tokio::spawn(async move {
            Self::supervise(source, store, config, units, Arc::new(progress_tx), cancel_batch)
                .await
        });

        BatchHandle { progress: progress_rx, cancel, join }
    }

    /// Recompute every driver/race the source knows about and wait for the result.
    pub async fn run_all<S, M>(
        source: Arc<S>,
        store: Arc<M>,
        config: EngineConfig,
    ) -> Result<BatchReport>
    where
        S: LapSource + ?Sized,
        M: MetricsStore + ?Sized,
    {
        config.validate()?;
        let timeout = config.batch.source_timeout();
        let units = tokio::time::timeout(timeout, source.driver_races())
            .await
            .map_err(|_| TyrewallError::SourceTimeout { duration: timeout })??;

        Self::spawn(source, store, config, units).join().await
    }

    async fn supervise<S, M>(
        source: Arc<S>,
        store: Arc<M>,
        config: EngineConfig,
        units: Vec<DriverRaceKey>,
        progress: Arc<watch::Sender<BatchProgress>>,
        cancel: CancellationToken,
    ) -> BatchReport
    where
        S: LapSource + ?Sized,
        M: MetricsStore + ?Sized,
    {
        info!(units = units.len(), "Batch started");
        if let Err(error) = config.validate() {
            warn!(units = units.len(), "Rejecting batch: {}", error);
        }
        let calculator = Arc::new(DegradationCalculator::new(config));
        let semaphore = Arc::new(Semaphore::new(calculator.config().batch.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut report = BatchReport::default();

        for key in units {
            if let Err(error) = calculator.config().validate() {
                let outcome = UnitOutcome::Failed { error, stints: 0 };
                progress.send_modify(|p| p.record(&outcome));
                report.record(key, outcome);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                let outcome = UnitOutcome::Cancelled { stints: 0 };
                progress.send_modify(|p| p.record(&outcome));
                report.record(key, outcome);
                continue;
            };

            let source = Arc::clone(&source);
            let store = Arc::clone(&store);
            let calculator = Arc::clone(&calculator);
            let progress = Arc::clone(&progress);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let written = AtomicUsize::new(0);
                let unit = Self::run_unit(&*source, &*store, &calculator, key, &cancel, &written);
                let outcome = match AssertUnwindSafe(unit).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let reason = panic_reason(payload.as_ref());
                        error!(%key, "Unit panicked: {}", reason);
                        let reason = format!("unit panicked: {reason}");
                        UnitOutcome::Failed {
                            error: TyrewallError::Batch { reason },
                            stints: written.load(Ordering::SeqCst),
                        }
                    }
                };
                progress.send_modify(|p| p.record(&outcome));
                (key, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, outcome)) => report.record(key, outcome),
                Err(e) => error!("Unit task aborted: {}", e),
            }
        }

        let totals = *progress.borrow();
        info!(
            completed = totals.completed,
            failed = totals.failed,
            cancelled = totals.cancelled,
            stints = totals.stints_written,
            "Batch finished"
        );
        report
    }

    /// Process one driver/race unit
    async fn run_unit<S, M>(
        source: &S,
        store: &M,
        calculator: &DegradationCalculator,
        key: DriverRaceKey,
        cancel: &CancellationToken,
        written: &AtomicUsize,
    ) -> UnitOutcome
    where
        S: LapSource + ?Sized,
        M: MetricsStore + ?Sized,
    {
        if cancel.is_cancelled() {
            return UnitOutcome::Cancelled { stints: 0 };
        }

        let timeout = calculator.config().batch.source_timeout();
        let fetch = async {
            let laps = source.laps(key).await?;
            let weather = source.weather(key.race_id).await?;
            Ok::<_, TyrewallError>((laps, weather))
        };
        let (laps, weather) = match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(fetched)) => fetched,
            Ok(Err(error)) => {
                warn!(%key, "Source failed: {}", error);
                return UnitOutcome::Failed { error, stints: 0 };
            }
            Err(_) => {
                warn!(%key, ?timeout, "Source timed out");
                return UnitOutcome::Failed {
                    error: TyrewallError::SourceTimeout { duration: timeout },
                    stints: 0,
                };
            }
        };

        let weather = WeatherIndex::from_samples(weather);
        let windows = match segment_stints(key.race_id, key.driver_id, &laps) {
            Ok(windows) => windows,
            Err(error) => {
                warn!(%key, "Skipping driver race: {}", error);
                return UnitOutcome::Failed { error, stints: 0 };
            }
        };

        let mut stints = 0;
        for window in &windows {
            if cancel.is_cancelled() {
                info!(%key, stints, remaining = windows.len() - stints, "Unit cancelled");
                return UnitOutcome::Cancelled { stints };
            }

            let metric = calculator.compute(window, &weather);
            if let Err(error) = store.upsert(metric).await {
                error!(%key, stint = window.stint_number(), "Upsert failed: {}", error);
                return UnitOutcome::Failed { error, stints };
            }
            stints += 1;
            written.fetch_add(1, Ordering::SeqCst);
        }

        debug!(%key, stints, "Unit completed");
        UnitOutcome::Completed { stints }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemoryLapSource;
    use crate::store::MemoryMetricsStore;
    use crate::test_utils::{RACE, laps_from_stints, synthetic_race, synthetic_weather};
    use crate::types::{DriverId, StintKey, StintMetric};
    use futures::StreamExt;

    fn source_with(drivers: &[(u32, &[u32])]) -> MemoryLapSource {
        let mut source = MemoryLapSource::new();
        for (driver, stints) in drivers {
            source.extend_laps(synthetic_race(RACE, DriverId(*driver), stints));
        }
        source.extend_weather(synthetic_weather(RACE, 60));
        source
    }

    #[tokio::test]
    async fn computes_every_unit() {
        let _ = tracing_subscriber::fmt::try_init();
        let source = Arc::new(source_with(&[(1, &[10, 20]), (2, &[15, 15, 5])]));
        let store = Arc::new(MemoryMetricsStore::new());

        let report = BatchDriver::run_all(source, Arc::clone(&store), EngineConfig::default())
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        assert!(report.all_completed());
        assert_eq!(report.stints_written(), 5);
        assert_eq!(store.len().await, 5);

        let metric = store.get(&StintKey::new(RACE, DriverId(2), 3)).await.unwrap().unwrap();
        assert_eq!((metric.stint_start_lap, metric.stint_end_lap), (31, 35));
        assert!(metric.avg_track_temp.is_some());
    }

    #[tokio::test]
    async fn integrity_error_is_isolated() {
        let mut source = source_with(&[(1, &[10, 10])]);
        let mut broken = laps_from_stints(&[1, 1, 2, 2, 1]);
        for lap in &mut broken {
            lap.driver_id = DriverId(7);
        }
        source.extend_laps(broken);

        let store = Arc::new(MemoryMetricsStore::new());
        let report =
            BatchDriver::run_all(Arc::new(source), Arc::clone(&store), EngineConfig::default())
                .await
                .unwrap();

        let bad = DriverRaceKey::new(RACE, DriverId(7));
        assert!(matches!(
            report.outcome(&bad).and_then(UnitOutcome::error),
            Some(TyrewallError::SegmentationIntegrity { .. })
        ));
        assert!(report.retryable().is_empty());
        assert!(store.metrics_for(bad).await.unwrap().is_empty());
        let good = store.metrics_for(DriverRaceKey::new(RACE, DriverId(1))).await.unwrap();
        assert_eq!(good.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_source_fails_units_without_writes() {
        let source = Arc::new(source_with(&[(1, &[5]), (2, &[5])]));
        source.set_available(false);
        let store = Arc::new(MemoryMetricsStore::new());
        let units =
            vec![DriverRaceKey::new(RACE, DriverId(1)), DriverRaceKey::new(RACE, DriverId(2))];

        let report = BatchDriver::spawn(source, Arc::clone(&store), EngineConfig::default(), units)
            .join()
            .await
            .unwrap();

        assert_eq!(report.failed().count(), 2);
        assert_eq!(report.retryable().len(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn cancelled_batch_writes_nothing_new() {
        let source = Arc::new(source_with(&[(1, &[5, 5]), (2, &[5, 5])]));
        let store = Arc::new(MemoryMetricsStore::new());
        let units = source.driver_races().await.unwrap();

        let handle = BatchDriver::spawn(source, Arc::clone(&store), EngineConfig::default(), units);
        // Current-thread runtime: the supervisor has not been polled yet.
        handle.cancel();
        let report = handle.join().await.unwrap();

        assert_eq!(report.len(), 2);
        assert!(report.outcomes().all(|(_, o)| matches!(o, UnitOutcome::Cancelled { .. })));
        assert_eq!(report.stints_written(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn progress_reaches_totals() {
        let source = Arc::new(source_with(&[(1, &[8, 8]), (2, &[16]), (3, &[4, 4, 4])]));
        let store = Arc::new(MemoryMetricsStore::new());
        let units = source.driver_races().await.unwrap();
        let config = EngineConfig::parse("batch:\n  max_concurrency: 1\n").unwrap();

        let handle = BatchDriver::spawn(source, store, config, units);
        let mut updates = Box::pin(handle.progress_updates());
        let mut last = BatchProgress::default();
        while let Some(progress) = updates.next().await {
            last = progress;
            if progress.is_done() {
                break;
            }
        }
        let report = handle.join().await.unwrap();

        assert_eq!(last.total_units, 3);
        assert_eq!(last.completed, 3);
        assert_eq!(last.stints_written, 6);
        assert_eq!(report.stints_written(), 6);
    }

    /// Store that panics when asked to write a given driver's second stint
    #[derive(Default)]
    struct PanickingStore {
        inner: MemoryMetricsStore,
        driver: u32,
    }

    #[async_trait::async_trait]
    impl MetricsStore for PanickingStore {
        async fn upsert(&self, metric: StintMetric) -> Result<()> {
            if metric.key.driver_id == DriverId(self.driver) && metric.key.stint_number == 2 {
                panic!("store invariant violated");
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

    #[tokio::test]
    async fn panicking_unit_is_reported_as_failed() {
        let source = Arc::new(source_with(&[(1, &[6, 6]), (2, &[6, 6])]));
        let store = Arc::new(PanickingStore { driver: 2, ..PanickingStore::default() });
        let units = source.driver_races().await.unwrap();

        let handle = BatchDriver::spawn(source, Arc::clone(&store), EngineConfig::default(), units);
        let progress = handle.progress.clone();
        let report = handle.join().await.unwrap();

        assert_eq!(report.len(), 2);
        assert!(!report.all_completed());
        let bad = DriverRaceKey::new(RACE, DriverId(2));
        match report.outcome(&bad) {
            Some(UnitOutcome::Failed { error: TyrewallError::Batch { reason }, stints }) => {
                assert!(reason.contains("store invariant violated"));
                assert_eq!(*stints, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let totals = *progress.borrow();
        assert!(totals.is_done());
        assert_eq!((totals.completed, totals.failed), (1, 1));
    }

    #[tokio::test]
    async fn spawn_rejects_invalid_config_without_writing() {
        let source = Arc::new(source_with(&[(1, &[4, 4])]));
        let store = Arc::new(MemoryMetricsStore::new());
        let units = source.driver_races().await.unwrap();
        let config = EngineConfig::default();
        BatchDriver::spawn(Arc::clone(&source), Arc::clone(&store), config, units.clone())
            .join()
            .await
            .unwrap();
        let before = store.snapshot().await;

        let mut config = EngineConfig::default();
        config.filter.qualifying_statuses.clear();
        let handle = BatchDriver::spawn(source, Arc::clone(&store), config, units);
        let progress = handle.progress.clone();
        let report = handle.join().await.unwrap();

        assert!(matches!(report.failed().next(), Some((_, TyrewallError::Config { .. }))));
        assert!(report.retryable().is_empty());
        assert!(progress.borrow().is_done());
        let after = store.snapshot().await;
        assert_eq!(before.len(), 2);
        assert!(before.iter().zip(&after).all(|(a, b)| Arc::ptr_eq(a, b)));
    }
}
