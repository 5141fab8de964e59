//! End-to-end stint metric scenarios through the public API

use tyrewall::{
    DriverId, EngineConfig, LapRecord, RaceId, StintAnomaly, TrackStatus, TyrewallError,
    WeatherIndex, compute_driver_race,
};

const RACE: RaceId = RaceId(3);
const DRIVER: DriverId = DriverId(16);
const EPS: f64 = 1e-9;

fn laps(times: &[f64]) -> Vec<LapRecord> {
    times
        .iter()
        .enumerate()
        .map(|(i, &time)| LapRecord::new(RACE, DRIVER, i as u32 + 1, time, 1))
        .collect()
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or(f64::NAN);
    assert!((actual - expected).abs() < EPS, "expected {expected}, got {actual}");
}

fn compute(laps: &[LapRecord]) -> tyrewall::Result<Vec<tyrewall::StintMetric>> {
    compute_driver_race(RACE, DRIVER, laps, &WeatherIndex::new(), &EngineConfig::default())
}

#[test]
fn clean_stint_statistics() -> anyhow::Result<()> {
    let metrics = compute(&laps(&[90.1, 90.5, 91.0, 91.8]))?;
    assert_eq!(metrics.len(), 1);

    let metric = &metrics[0];
    assert_eq!(metric.total_laps, 4);
    assert_close(metric.degradation_rate, 1.7 / 3.0);
    assert_close(metric.total_time_loss, 1.7);
    assert_close(metric.avg_lap_time_seconds, 90.85);
    assert_close(metric.median_lap_time_seconds, 90.75);
    assert_close(metric.fastest_lap_time_seconds, 90.1);
    assert!(!metric.has_anomalies());
    Ok(())
}

#[test]
fn inaccurate_lap_is_excluded_from_statistics() -> anyhow::Result<()> {
    let mut laps = laps(&[90.1, 90.5, 91.0, 91.8]);
    laps[2].is_accurate = false;

    let metric = compute(&laps)?.remove(0);
    assert_eq!(metric.total_laps, 4);
    assert_eq!(metric.qualifying_laps, 3);
    assert_close(metric.degradation_rate, 0.85);
    assert_close(metric.fastest_lap_time_seconds, 90.1);
    assert_close(metric.median_lap_time_seconds, 90.5);
    Ok(())
}

#[test]
fn single_lap_stint_has_no_rate() -> anyhow::Result<()> {
    let metric = compute(&laps(&[88.2]))?.remove(0);
    assert_eq!(metric.total_laps, 1);
    assert_eq!(metric.degradation_rate, None);
    assert_eq!(metric.calculated_time_loss(), None);
    assert_close(metric.total_time_loss, 0.0);
    for value in [
        metric.fastest_lap_time_seconds,
        metric.avg_lap_time_seconds,
        metric.median_lap_time_seconds,
        metric.first_lap_time_seconds,
        metric.last_lap_time_seconds,
    ] {
        assert_close(value, 88.2);
    }
    Ok(())
}

#[test]
fn decreasing_stint_number_emits_nothing() {
    let mut laps = laps(&[90.0; 5]);
    for (lap, stint) in laps.iter_mut().zip([1, 1, 2, 2, 1]) {
        lap.stint_number = stint;
    }

    let err = compute(&laps).unwrap_err();
    assert!(matches!(err, TyrewallError::SegmentationIntegrity { lap_number: 5, .. }));
    assert!(!err.is_retryable());
}

#[test]
fn caution_laps_only_stint_keeps_structure() -> anyhow::Result<()> {
    let mut laps = laps(&[101.0, 104.2]);
    for lap in &mut laps {
        lap.track_status = TrackStatus::from_code("4");
    }

    let metric = compute(&laps)?.remove(0);
    assert_eq!((metric.stint_start_lap, metric.stint_end_lap, metric.total_laps), (1, 2, 2));
    assert_eq!(metric.qualifying_laps, 0);
    assert_eq!(metric.avg_lap_time_seconds, None);
    assert_eq!(metric.total_time_loss, None);
    assert_eq!(metric.anomalies, vec![StintAnomaly::NoQualifyingLaps]);
    Ok(())
}

#[test]
fn stint_windows_tile_the_race() -> anyhow::Result<()> {
    let mut laps = laps(&[91.0; 9]);
    for (lap, stint) in laps.iter_mut().zip([1, 1, 1, 2, 2, 2, 2, 3, 3]) {
        lap.stint_number = stint;
    }
    laps.reverse();

    let metrics = compute(&laps)?;
    let windows: Vec<_> =
        metrics.iter().map(|m| (m.key.stint_number, m.stint_start_lap, m.stint_end_lap)).collect();
    assert_eq!(windows, vec![(1, 1, 3), (2, 4, 7), (3, 8, 9)]);
    assert_eq!(metrics.iter().map(|m| m.total_laps).sum::<u32>(), 9);
    Ok(())
}

#[test]
fn filter_policy_comes_from_config() -> anyhow::Result<()> {
    let mut laps = laps(&[90.0, 95.0, 90.4]);
    laps[1].track_status = TrackStatus::from_code("2");

    let strict = compute(&laps)?.remove(0);
    assert_eq!(strict.qualifying_laps, 2);

    let config = EngineConfig::parse("filter:\n  qualifying_statuses: [\"1\", \"2\"]\n")?;
    let relaxed =
        compute_driver_race(RACE, DRIVER, &laps, &WeatherIndex::new(), &config)?.remove(0);
    assert_eq!(relaxed.qualifying_laps, 3);
    assert_close(relaxed.fastest_lap_time_seconds, 90.0);
    assert_close(relaxed.total_time_loss, 5.0);
    Ok(())
}
