//! Tyre stint segmentation and degradation metrics for race lap telemetry.
//!
//! Tyrewall groups each driver's laps into stints (runs between pit stops),
//! then summarises every stint as a [`StintMetric`] row: lap-time statistics
//! over the accurate green-flag laps, a degradation rate, and weather averages.
//!
//! # Features
//!
//! - **Segmentation**: contiguous stint windows with integrity checks
//! - **Metrics**: median, mean, fastest lap, degradation and time loss per stint
//! - **Batch recompute**: concurrent per-driver units with cancellation and progress
//! - **Idempotent writes**: one row per stint, replaced whole on upsert
//!
//! # Quick Start
//!
//! ```rust
//! use tyrewall::{DriverId, EngineConfig, LapRecord, RaceId, WeatherIndex, compute_driver_race};
//!
//! let laps: Vec<LapRecord> = [90.0, 90.5, 91.0, 91.5]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &time)| LapRecord::new(RaceId(1), DriverId(44), i as u32 + 1, time, 1))
//!     .collect();
//!
//! let config = EngineConfig::default();
//! let weather = WeatherIndex::new();
//! let metrics = compute_driver_race(RaceId(1), DriverId(44), &laps, &weather, &config)?;
//!
//! assert_eq!(metrics.len(), 1);
//! assert_eq!(metrics[0].median_lap_time_seconds, Some(90.75));
//! assert_eq!(metrics[0].total_time_loss, Some(1.5));
//! # Ok::<(), tyrewall::TyrewallError>(())
//! ```
//!
//! ## Batch recompute
//!
//! ```rust
//! use std::sync::Arc;
//! use tyrewall::{BatchDriver, EngineConfig, LapRecord, RaceId, DriverId};
//! use tyrewall::sources::MemoryLapSource;
//! use tyrewall::store::MemoryMetricsStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tyrewall::Result<()> {
//! let laps = (1..=10).map(|lap| LapRecord::new(RaceId(1), DriverId(44), lap, 90.0, 1 + lap / 6));
//! let source = Arc::new(MemoryLapSource::from_records(laps, Vec::new()));
//! let store = Arc::new(MemoryMetricsStore::new());
//!
//! let report = BatchDriver::run_all(source, Arc::clone(&store), EngineConfig::default()).await?;
//! assert!(report.all_completed());
//! assert_eq!(report.stints_written(), 2);
//! # Ok(())
//! # }
//! ```

mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Pure computation
pub mod config;
pub mod metrics;
pub mod segment;
pub mod stats;

// Sources, sinks and batch orchestration
pub mod driver;
pub mod source;
pub mod sources;
pub mod store;

// Reporting
pub mod reference;
pub mod views;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::{BatchConfig, CompoundResolution, EngineConfig, FilterPolicy};
pub use driver::{BatchDriver, BatchHandle, BatchProgress, BatchReport, UnitOutcome};
pub use metrics::{DegradationCalculator, StintLapFeatures, compute_driver_race, stint_lap_series};
pub use segment::{StintWindow, segment_stints};
pub use source::LapSource;
pub use store::MetricsStore;
