//! Patient models.

use serde::{Deserialize, Serialize};

use super::slot::Track;

/// Patient status the agenda lists patients for.
pub const STATUS_IN_CARE: &str = "in_cura";

/// Which agenda tracks a patient may be booked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackTag {
    #[serde(rename = "PICC")]
    Picc,
    #[serde(rename = "MED")]
    Med,
    /// Followed on both tracks
    #[serde(rename = "PICC_MED")]
    PiccMed,
}

impl TrackTag {
    pub fn allows(&self, track: Track) -> bool {
        match self {
            TrackTag::PiccMed => true,
            TrackTag::Picc => track == Track::Picc,
            TrackTag::Med => track == Track::Med,
        }
    }
}

impl From<Track> for TrackTag {
    fn from(track: Track) -> Self {
        match track {
            Track::Picc => TrackTag::Picc,
            Track::Med => TrackTag::Med,
        }
    }
}

/// A patient as listed by the clinic API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    #[serde(rename = "nome")]
    pub first_name: String,
    #[serde(rename = "cognome")]
    pub last_name: String,
    #[serde(rename = "tipo")]
    pub track_tag: TrackTag,
    pub ambulatorio: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    STATUS_IN_CARE.to_string()
}

impl Patient {
    /// Create a patient record from a validated request, with a fresh id.
    pub fn from_request(request: &NewPatient) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            track_tag: request.track_tag,
            ambulatorio: request.ambulatorio.clone(),
            status: default_status(),
        }
    }

    pub fn can_book_into(&self, track: Track) -> bool {
        self.track_tag.allows(track)
    }

    /// "Cognome Nome"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Case-insensitive substring match on first or last name. The query is
    /// taken as typed, surrounding spaces included. An empty query matches
    /// nobody.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.first_name.to_lowercase().contains(&query)
            || self.last_name.to_lowercase().contains(&query)
    }
}

/// Body of the quick patient creation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    #[serde(rename = "nome")]
    pub first_name: String,
    #[serde(rename = "cognome")]
    pub last_name: String,
    #[serde(rename = "tipo")]
    pub track_tag: TrackTag,
    pub ambulatorio: String,
}

impl NewPatient {
    /// Quick creation from the booking dialog: the tag follows the clicked
    /// slot's track, PICC when there is none.
    pub fn quick(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        track: Option<Track>,
        ambulatorio: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            track_tag: track.map(TrackTag::from).unwrap_or(TrackTag::Picc),
            ambulatorio: ambulatorio.into(),
        }
    }

    /// Names of the missing required fields.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push("nome");
        }
        if self.last_name.trim().is_empty() {
            missing.push("cognome");
        }
        if self.ambulatorio.trim().is_empty() {
            missing.push("ambulatorio");
        }
        missing
    }
}
