//! Stint segmentation
//!
//! Splits one driver's race into stints: maximal runs of laps sharing a stint
//! number. Stint numbers must never decrease over the lap sequence. A
//! sequence such as `[1, 1, 2, 2, 1]` means the input is corrupt and is
//! rejected instead of patched.

use tracing::{debug, trace};

use crate::types::{DriverId, LapRecord, RaceId};
use crate::{Result, TyrewallError};

/// A contiguous group of laps run on one tyre set.
#[derive(Debug, Clone, PartialEq)]
pub struct StintWindow {
    race_id: RaceId,
    driver_id: DriverId,
    stint_number: u32,
    start_lap: u32,
    end_lap: u32,
    laps: Vec<LapRecord>,
}

impl StintWindow {
    pub fn race_id(&self) -> RaceId {
        self.race_id
    }

    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    pub fn stint_number(&self) -> u32 {
        self.stint_number
    }

    /// First lap number of the window
    pub fn start_lap(&self) -> u32 {
        self.start_lap
    }

    /// Last lap number of the window
    pub fn end_lap(&self) -> u32 {
        self.end_lap
    }

    /// Laps in the window, ordered by lap number
    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    /// Number of lap numbers the window covers
    pub fn span(&self) -> u32 {
        self.end_lap - self.start_lap + 1
    }

    /// Number of lap records actually present
    pub fn recorded_laps(&self) -> u32 {
        self.laps.len() as u32
    }

    /// Whether lap numbers are missing inside the window
    pub fn has_gaps(&self) -> bool {
        self.recorded_laps() < self.span()
    }

    /// Whether the stint began on a new tyre set, per its first lap
    pub fn started_on_fresh_tyres(&self) -> bool {
        self.laps.first().is_some_and(|lap| lap.fresh_tyre)
    }
}

/// Segment one driver's race into stint windows.
///
/// Laps may arrive in any order; they are sorted by lap number first. Every
/// lap must belong to `race_id`/`driver_id` and pass
/// [`LapRecord::validate`]. Returns an empty list for an empty input.
///
/// # Errors
///
/// - [`TyrewallError::InvalidLap`] for a foreign or malformed lap
/// - [`TyrewallError::SegmentationIntegrity`] for a duplicate lap number or a
///   stint number lower than one already seen
pub fn segment_stints(
    race_id: RaceId,
    driver_id: DriverId,
    laps: &[LapRecord],
) -> Result<Vec<StintWindow>> {
    let mut ordered: Vec<&LapRecord> = Vec::with_capacity(laps.len());
    for lap in laps {
        if lap.race_id != race_id || lap.driver_id != driver_id {
            return Err(TyrewallError::invalid_lap(
                race_id,
                driver_id,
                lap.lap_number,
                format!("lap belongs to race {} driver {}", lap.race_id, lap.driver_id),
            ));
        }
        lap.validate()?;
        ordered.push(lap);
    }
    ordered.sort_by_key(|lap| lap.lap_number);

    let mut windows: Vec<StintWindow> = Vec::new();
    let mut previous: Option<&LapRecord> = None;

    for lap in ordered {
        if let Some(prev) = previous {
            if lap.lap_number == prev.lap_number {
                return Err(TyrewallError::segmentation(
                    race_id,
                    driver_id,
                    lap.lap_number,
                    "lap recorded more than once",
                ));
            }
            if lap.stint_number < prev.stint_number {
                return Err(TyrewallError::segmentation(
                    race_id,
                    driver_id,
                    lap.lap_number,
                    format!(
                        "stint number went from {} at lap {} back to {}",
                        prev.stint_number, prev.lap_number, lap.stint_number
                    ),
                ));
            }
        }

        match windows.last_mut() {
            Some(window) if window.stint_number == lap.stint_number => {
                window.end_lap = lap.lap_number;
                window.laps.push(lap.clone());
            }
            _ => {
                trace!(
                    race_id = %race_id,
                    driver_id = %driver_id,
                    stint = lap.stint_number,
                    lap = lap.lap_number,
                    "Opening stint window"
                );
                windows.push(StintWindow {
                    race_id,
                    driver_id,
                    stint_number: lap.stint_number,
                    start_lap: lap.lap_number,
                    end_lap: lap.lap_number,
                    laps: vec![lap.clone()],
                });
            }
        }

        previous = Some(lap);
    }

    debug!(
        race_id = %race_id,
        driver_id = %driver_id,
        laps = laps.len(),
        stints = windows.len(),
        "Segmented driver race"
    );

    Ok(windows)
}
