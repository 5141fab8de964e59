//! Identifier newtypes for races, drivers and reference data

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Race identifier (one race session of a season)
    RaceId
);
id_type!(
    /// Driver identifier
    DriverId
);
id_type!(
    /// Tyre compound identifier
    CompoundId
);
id_type!(
    /// Circuit identifier
    CircuitId
);
id_type!(
    /// Team identifier
    TeamId
);

/// One driver's race: the unit of segmentation and batch work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverRaceKey {
    pub race_id: RaceId,
    pub driver_id: DriverId,
}

impl DriverRaceKey {
    pub fn new(race_id: RaceId, driver_id: DriverId) -> Self {
        Self { race_id, driver_id }
    }
}

impl fmt::Display for DriverRaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "race {} driver {}", self.race_id, self.driver_id)
    }
}

/// Unique key of a stint metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StintKey {
    pub race_id: RaceId,
    pub driver_id: DriverId,
    pub stint_number: u32,
}

impl StintKey {
    pub fn new(race_id: RaceId, driver_id: DriverId, stint_number: u32) -> Self {
        Self { race_id, driver_id, stint_number }
    }

    /// The driver/race this stint belongs to
    pub fn driver_race(&self) -> DriverRaceKey {
        DriverRaceKey::new(self.race_id, self.driver_id)
    }
}

impl fmt::Display for StintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "race {} driver {} stint {}", self.race_id, self.driver_id, self.stint_number)
    }
}
