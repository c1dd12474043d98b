//! Appointment models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::slot::{Slot, Track};

/// Appointment status. Wire values follow the clinic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Not yet seen
    #[default]
    #[serde(rename = "da_fare")]
    Pending,
    /// Service delivered
    #[serde(rename = "effettuato")]
    Done,
    /// Patient did not show up
    #[serde(rename = "non_presentato")]
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 3] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Done,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "da_fare",
            AppointmentStatus::Done => "effettuato",
            AppointmentStatus::NoShow => "non_presentato",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "da_fare" => Some(AppointmentStatus::Pending),
            "effettuato" => Some(AppointmentStatus::Done),
            "non_presentato" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }
}

/// Older records carry `"stato": null` or no status at all.
fn status_or_pending<'de, D>(deserializer: D) -> Result<AppointmentStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<AppointmentStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// A booked appointment as returned by the clinic API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Opaque id assigned by the authoritative store
    pub id: String,
    pub patient_id: String,
    /// Denormalized first name
    #[serde(rename = "patient_nome", default)]
    pub patient_first_name: String,
    /// Denormalized last name
    #[serde(rename = "patient_cognome", default)]
    pub patient_last_name: String,
    /// Clinic site
    pub ambulatorio: String,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "ora")]
    pub time: String,
    #[serde(rename = "tipo")]
    pub track: Track,
    #[serde(rename = "stato", default, deserialize_with = "status_or_pending")]
    pub status: AppointmentStatus,
    /// Selected service ids
    #[serde(rename = "prestazioni", default)]
    pub services: Vec<String>,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot::new(self.time.clone(), self.track)
    }

    pub fn occupies(&self, date: NaiveDate, slot: &Slot) -> bool {
        self.date == date && self.time == slot.time && self.track == slot.track
    }

    /// "Cognome Nome"
    pub fn patient_display_name(&self) -> String {
        format!("{} {}", self.patient_last_name, self.patient_first_name)
            .trim()
            .to_string()
    }

    /// Short label shown in a grid cell: "Cognome N."
    pub fn badge(&self) -> String {
        match self.patient_first_name.chars().next() {
            Some(initial) => format!("{} {}.", self.patient_last_name, initial),
            None => self.patient_last_name.clone(),
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: String,
    pub ambulatorio: String,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "ora")]
    pub time: String,
    #[serde(rename = "tipo")]
    pub track: Track,
    #[serde(rename = "prestazioni")]
    pub services: Vec<String>,
}

impl NewAppointment {
    pub fn slot(&self) -> Slot {
        Slot::new(self.time.clone(), self.track)
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPatch {
    #[serde(rename = "stato", skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "prestazioni", skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            services: None,
        }
    }

    pub fn services(services: Vec<String>) -> Self {
        Self {
            status: None,
            services: Some(services),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(stato: &str) -> String {
        format!(
            r#"{{
                "id": "a1",
                "patient_id": "p1",
                "patient_nome": "Mario",
                "patient_cognome": "Rossi",
                "ambulatorio": "pta_centro",
                "data": "2024-06-10",
                "ora": "09:00",
                "tipo": "PICC",
                {}
                "prestazioni": ["medicazione_semplice"]
            }}"#,
            stato
        )
    }

    #[test]
    fn test_deserialize_wire_record() {
        let appt: Appointment =
            serde_json::from_str(&sample_json(r#""stato": "effettuato","#)).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Done);
        assert_eq!(appt.date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(appt.slot(), Slot::new("09:00", Track::Picc));
        assert_eq!(appt.badge(), "Rossi M.");
        assert_eq!(appt.patient_display_name(), "Rossi Mario");
    }

    #[test]
    fn test_missing_or_null_status_is_pending() {
        let missing: Appointment = serde_json::from_str(&sample_json("")).unwrap();
        assert_eq!(missing.status, AppointmentStatus::Pending);

        let null: Appointment =
            serde_json::from_str(&sample_json(r#""stato": null,"#)).unwrap();
        assert_eq!(null.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = AppointmentPatch::status(AppointmentStatus::NoShow);
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"stato":"non_presentato"}"#
        );
        let patch = AppointmentPatch::services(vec!["irrigazione_catetere".into()]);
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"prestazioni":["irrigazione_catetere"]}"#
        );
    }

    #[test]
    fn test_status_parse_round() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("annullato"), None);
    }
}
