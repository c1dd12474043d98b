//! Vascular access device implant record ("scheda impianto").
//!
//! The record mirrors the paper form field by field. It is data-entry glue:
//! the core only validates the required fields and moves it to and from the
//! records API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;

/// Answer to a yes/no question on the form that may be left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TriState {
    Yes,
    No,
    #[default]
    Unset,
}

impl TriState {
    pub fn is_answered(&self) -> bool {
        !matches!(self, TriState::Unset)
    }

    /// Clicking an already checked box clears it; clicking the other box switches.
    pub fn toggled(self, answer: bool) -> Self {
        match (self, answer) {
            (TriState::Yes, true) | (TriState::No, false) => TriState::Unset,
            (_, true) => TriState::Yes,
            (_, false) => TriState::No,
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
            None => TriState::Unset,
        }
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::Yes => Some(true),
            TriState::No => Some(false),
            TriState::Unset => None,
        }
    }
}

/// Implant record as exchanged with the records API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImplantRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub ambulatorio: String,

    // Header
    #[serde(rename = "presidio_ospedaliero")]
    pub hospital: String,
    #[serde(rename = "codice")]
    pub code: String,
    #[serde(rename = "unita_operativa")]
    pub ward: String,
    #[serde(rename = "data_presa_carico")]
    pub taken_in_charge_on: Option<NaiveDate>,
    #[serde(rename = "cartella_clinica")]
    pub chart_number: String,

    // Catheter already in place
    #[serde(rename = "catetere_presente")]
    pub existing_catheter: bool,
    #[serde(rename = "catetere_presente_tipo")]
    pub existing_catheter_type: String,
    #[serde(rename = "catetere_presente_struttura")]
    pub existing_catheter_facility: String,
    #[serde(rename = "catetere_presente_data")]
    pub existing_catheter_date: String,
    #[serde(rename = "catetere_presente_ora")]
    pub existing_catheter_time: String,
    /// emergenza_urgenza | programmato_elezione
    #[serde(rename = "catetere_presente_modalita")]
    pub existing_catheter_mode: String,
    #[serde(rename = "catetere_presente_rx")]
    pub existing_catheter_xray: TriState,
    #[serde(rename = "catetere_da_sostituire")]
    pub catheter_to_replace: TriState,

    // Implant
    #[serde(rename = "tipo_catetere")]
    pub catheter_type: String,
    #[serde(rename = "posizionamento_cvc")]
    pub cvc_site: String,
    #[serde(rename = "posizionamento_cvc_altro")]
    pub cvc_site_other: String,
    /// dx | sn
    #[serde(rename = "braccio")]
    pub arm: String,
    #[serde(rename = "vena")]
    pub vein: String,
    pub exit_site_cm: String,

    // Procedure
    #[serde(rename = "valutazione_sito")]
    pub site_assessment: TriState,
    #[serde(rename = "ecoguidato")]
    pub ultrasound_guided: TriState,
    #[serde(rename = "igiene_mani")]
    pub hand_hygiene: TriState,
    #[serde(rename = "precauzioni_barriera")]
    pub barrier_precautions: TriState,
    #[serde(rename = "disinfezione")]
    pub disinfection: Vec<String>,

    // Devices and dressings
    pub sutureless_device: TriState,
    #[serde(rename = "medicazione_trasparente")]
    pub transparent_dressing: TriState,
    #[serde(rename = "medicazione_occlusiva")]
    pub occlusive_dressing: TriState,

    // Checks
    #[serde(rename = "controllo_rx")]
    pub xray_check: TriState,
    #[serde(rename = "controllo_ecg")]
    pub ecg_check: TriState,

    /// emergenza | urgenza | elezione
    #[serde(rename = "modalita")]
    pub mode: String,
    #[serde(rename = "motivazione")]
    pub reasons: Vec<String>,
    #[serde(rename = "motivazione_altro")]
    pub reason_other: String,

    // Footer
    #[serde(rename = "data_posizionamento")]
    pub placed_on: Option<NaiveDate>,
    #[serde(rename = "operatore")]
    pub operator: String,

    /// Keys (server id or temporary id) of the attachments
    #[serde(rename = "allegati")]
    pub attachment_keys: Vec<String>,
    #[serde(rename = "allegati_data", skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ImplantRecord {
    /// Empty form for a patient, dated `today`.
    pub fn blank(patient_id: impl Into<String>, ambulatorio: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            patient_id: patient_id.into(),
            ambulatorio: ambulatorio.into(),
            taken_in_charge_on: Some(today),
            placed_on: Some(today),
            ..Default::default()
        }
    }

    /// Names of the missing required fields.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.patient_id.trim().is_empty() {
            missing.push("patient_id");
        }
        if self.ambulatorio.trim().is_empty() {
            missing.push("ambulatorio");
        }
        if self.placed_on.is_none() {
            missing.push("data_posizionamento");
        }
        missing
    }

    /// Suggested file name for the PDF export.
    pub fn pdf_file_name(&self) -> String {
        match self.placed_on {
            Some(date) => format!("scheda_impianto_{}.pdf", date.format("%Y-%m-%d")),
            None => "scheda_impianto_nd.pdf".to_string(),
        }
    }
}
