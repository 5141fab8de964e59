//! Core types for lap telemetry and stint analytics.
//!
//! ## Architecture
//!
//! The types mirror the tables the engine reads and writes:
//! - [`LapRecord`] is one driver's observation of one lap (input, append-only)
//! - [`WeatherSample`] is a per-lap environmental reading, joined through [`WeatherIndex`]
//! - [`PitStop`] records a stop at the end of a lap
//! - [`StintMetric`] is the one-row-per-stint output, keyed by [`StintKey`]
//! - [`TirePrediction`] is the row shape downstream models write from the metrics
//!
//! ## Usage Example
//!
//! ```rust
//! use tyrewall::types::{DriverId, LapRecord, RaceId, TrackStatus};
//!
//! let mut lap = LapRecord::new(RaceId(1), DriverId(44), 12, 93.281, 2);
//! lap.track_status = TrackStatus::from_code("12");
//!
//! assert!(lap.validate().is_ok());
//! assert!(!lap.track_status.is_normal());
//! ```

mod ids;
mod lap;
mod metric;
mod pit_stop;
mod prediction;
mod track_status;
mod weather;

pub use ids::{CircuitId, CompoundId, DriverId, DriverRaceKey, RaceId, StintKey, TeamId};
pub use lap::LapRecord;
pub use metric::{StintAnomaly, StintMetric};
pub use pit_stop::PitStop;
pub use prediction::TirePrediction;
pub use track_status::TrackStatus;
pub use weather::{WeatherIndex, WeatherSample};
