//! Track status codes as reported per lap

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Race condition during a lap.
///
/// Timing feeds report one single-character code per status seen during the
/// lap, so a lap that started green and ended under safety car arrives as
/// `"14"`. Such laps resolve to their most severe status.
///
/// Serialises as its code string. Deserialises from a code string or a bare
/// integer code, so `"12"`, `"4"` and `4` are all accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StatusCode", into = "String")]
pub enum TrackStatus {
    /// `1` - track clear
    #[default]
    Green,
    /// `2` - yellow flag in at least one sector
    Yellow,
    /// `4` - safety car deployed
    SafetyCar,
    /// `5` - red flag
    Red,
    /// `6` - virtual safety car deployed
    VirtualSafetyCar,
    /// `7` - virtual safety car ending
    VscEnding,
    /// Code string containing characters outside the known set
    Unknown(String),
}

impl TrackStatus {
    /// Decode a status code string.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() {
            return TrackStatus::Green;
        }

        let mut worst = TrackStatus::Green;
        for ch in code.chars() {
            let status = match ch {
                '1' => TrackStatus::Green,
                '2' => TrackStatus::Yellow,
                '4' => TrackStatus::SafetyCar,
                '5' => TrackStatus::Red,
                '6' => TrackStatus::VirtualSafetyCar,
                '7' => TrackStatus::VscEnding,
                _ => return TrackStatus::Unknown(code.to_string()),
            };
            if status.severity() > worst.severity() {
                worst = status;
            }
        }
        worst
    }

    /// Canonical single-character code
    pub fn code(&self) -> &str {
        match self {
            TrackStatus::Green => "1",
            TrackStatus::Yellow => "2",
            TrackStatus::SafetyCar => "4",
            TrackStatus::Red => "5",
            TrackStatus::VirtualSafetyCar => "6",
            TrackStatus::VscEnding => "7",
            TrackStatus::Unknown(raw) => raw,
        }
    }

    /// Whether the lap ran under normal racing conditions
    pub fn is_normal(&self) -> bool {
        matches!(self, TrackStatus::Green)
    }

    fn severity(&self) -> u8 {
        match self {
            TrackStatus::Green => 0,
            TrackStatus::Yellow => 1,
            TrackStatus::VscEnding => 2,
            TrackStatus::VirtualSafetyCar => 3,
            TrackStatus::SafetyCar => 4,
            TrackStatus::Red => 5,
            TrackStatus::Unknown(_) => 6,
        }
    }
}

impl FromStr for TrackStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TrackStatus::from_code(s))
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw code as it appears in a feed: `"12"` or, from YAML, a bare `4`
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusCode {
    Text(String),
    Number(u64),
}

impl From<StatusCode> for TrackStatus {
    fn from(raw: StatusCode) -> Self {
        match raw {
            StatusCode::Text(code) => TrackStatus::from_code(&code),
            StatusCode::Number(code) => TrackStatus::from_code(&code.to_string()),
        }
    }
}

impl From<TrackStatus> for String {
    fn from(status: TrackStatus) -> Self {
        status.code().to_string()
    }
}
