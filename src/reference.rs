//! Reference data for circuits, teams, drivers, compounds and races
//!
//! The engine only ever reads these tables. They are handed in by the caller,
//! either assembled with the `with_*` builders or parsed from a YAML document
//! listing each table as a sequence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::types::{CircuitId, CompoundId, DriverId, RaceId, TeamId};
use crate::{Result, TyrewallError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub id: CircuitId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// A team entry. Teams are per season, so the same name can appear once per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub year: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    /// Three letter timing code
    pub code: String,
    #[serde(default)]
    pub number: Option<u32>,
    pub full_name: String,
    pub year: u16,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub id: CompoundId,
    /// Upper-case compound name such as `SOFT` or `INTERMEDIATE`
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: RaceId,
    pub year: u16,
    pub round: u32,
    pub name: String,
    pub circuit_id: CircuitId,
}

/// YAML layout accepted by [`ReferenceData::parse`]
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReferenceDocument {
    circuits: Vec<Circuit>,
    teams: Vec<Team>,
    drivers: Vec<Driver>,
    compounds: Vec<Compound>,
    races: Vec<Race>,
}

/// Read-only lookup tables keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    circuits: BTreeMap<CircuitId, Circuit>,
    teams: BTreeMap<TeamId, Team>,
    drivers: BTreeMap<DriverId, Driver>,
    compounds: BTreeMap<CompoundId, Compound>,
    races: BTreeMap<RaceId, Race>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse reference tables from YAML.
    ///
    /// ```rust
    /// use tyrewall::reference::ReferenceData;
    /// use tyrewall::types::{CompoundId, RaceId};
    ///
    /// let yaml = r#"
    /// circuits:
    ///   - { id: 1, name: Silverstone, country: UK }
    /// compounds:
    ///   - { id: 2, name: MEDIUM }
    /// races:
    ///   - { id: 10, year: 2024, round: 12, name: British Grand Prix, circuit_id: 1 }
    /// "#;
    /// let reference = ReferenceData::parse(yaml).unwrap();
    /// assert_eq!(reference.compound_name(CompoundId(2)), Some("MEDIUM"));
    /// let circuit = reference.circuit_for_race(RaceId(10)).map(|c| c.name.as_str());
    /// assert_eq!(circuit, Some("Silverstone"));
    /// ```
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let document: ReferenceDocument = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TyrewallError::config("reference data", e.to_string()))?;

        let mut reference = Self::default();
        reference = document.circuits.into_iter().fold(reference, Self::with_circuit);
        reference = document.teams.into_iter().fold(reference, Self::with_team);
        reference = document.drivers.into_iter().fold(reference, Self::with_driver);
        reference = document.compounds.into_iter().fold(reference, Self::with_compound);
        reference = document.races.into_iter().fold(reference, Self::with_race);
        Ok(reference)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| TyrewallError::ConfigFile { path: path.to_path_buf(), source })?;
        Self::parse(&contents)
    }

    pub fn with_circuit(mut self, circuit: Circuit) -> Self {
        if let Some(old) = self.circuits.insert(circuit.id, circuit) {
            warn!(id = %old.id, "Replaced circuit entry");
        }
        self
    }

    pub fn with_team(mut self, team: Team) -> Self {
        if let Some(old) = self.teams.insert(team.id, team) {
            warn!(id = %old.id, "Replaced team entry");
        }
        self
    }

    pub fn with_driver(mut self, driver: Driver) -> Self {
        if let Some(old) = self.drivers.insert(driver.id, driver) {
            warn!(id = %old.id, "Replaced driver entry");
        }
        self
    }

    pub fn with_compound(mut self, compound: Compound) -> Self {
        if let Some(old) = self.compounds.insert(compound.id, compound) {
            warn!(id = %old.id, "Replaced compound entry");
        }
        self
    }

    pub fn with_race(mut self, race: Race) -> Self {
        if let Some(old) = self.races.insert(race.id, race) {
            warn!(id = %old.id, "Replaced race entry");
        }
        self
    }

    pub fn circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(&id)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn driver(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.get(&id)
    }

    pub fn compound(&self, id: CompoundId) -> Option<&Compound> {
        self.compounds.get(&id)
    }

    pub fn race(&self, id: RaceId) -> Option<&Race> {
        self.races.get(&id)
    }

    pub fn compound_name(&self, id: CompoundId) -> Option<&str> {
        self.compound(id).map(|c| c.name.as_str())
    }

    pub fn circuit_for_race(&self, race_id: RaceId) -> Option<&Circuit> {
        self.race(race_id).and_then(|race| self.circuit(race.circuit_id))
    }

    /// Team the driver raced for, if the driver entry names one
    pub fn team_for_driver(&self, driver_id: DriverId) -> Option<&Team> {
        self.driver(driver_id).and_then(|d| d.team_id).and_then(|id| self.team(id))
    }

    /// Look up a compound by name, ignoring case
    pub fn compound_by_name(&self, name: &str) -> Option<&Compound> {
        self.compounds.values().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.races.values()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
            && self.teams.is_empty()
            && self.drivers.is_empty()
            && self.compounds.is_empty()
            && self.races.is_empty()
    }
}
