//! Tracks and slots of the daily agenda grid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Appointment category with its own column in the agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Track {
    /// PICC line care
    #[serde(rename = "PICC")]
    Picc,
    /// General medication/dressing services
    #[serde(rename = "MED")]
    Med,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Picc, Track::Med];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Picc => "PICC",
            Track::Med => "MED",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PICC" => Ok(Track::Picc),
            "MED" => Ok(Track::Med),
            _ => Err(format!("Unknown track: {}", s)),
        }
    }
}

/// A (time-of-day, track) cell of the agenda grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// Time of day, "HH:MM", drawn from the slot catalogue
    #[serde(rename = "ora")]
    pub time: String,
    #[serde(rename = "tipo")]
    pub track: Track,
}

impl Slot {
    pub fn new(time: impl Into<String>, track: Track) -> Self {
        Self {
            time: time.into(),
            track,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time, self.track)
    }
}

/// A bookable service offered in a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub id: &'static str,
    pub label: &'static str,
}
