//! PICC Clinic Core Library
//!
//! Day agenda for a vascular-access outpatient clinic: working-day
//! navigation, a capacity-bounded slot grid, appointment status tracking and
//! implant record attachments.
//!
//! # Architecture
//!
//! ```text
//!   CalendarService ──► Agenda ──────► SlotBoard (time × track cells)
//!   (weekend + holidays)  │
//!                         ▼
//!   SlotGrid ────────► AppointmentStore ──► ClinicBackend
//!   (slots, capacity,     │  day cache,        ├── Database (SQLite, capacity
//!    services)            │  write tracking    │   enforced in a transaction)
//!                         │                    └── HttpBackend (REST)
//!   StatusTransition ─────┘
//!
//!   RecordEditor ──► AttachmentSet ──► ImageDocument (picc-clinic-imaging)
//! ```
//!
//! # Core Principle
//!
//! **The backend decides capacity.** The local check only gives early
//! feedback; a booking exists once the backend confirms it.
//!
//! # Modules
//!
//! - [`calendar`]: Working-day predicate and search
//! - [`schedule`]: Slot grid, appointment store, status lifecycle, agenda and dialogs
//! - [`backend`]: Collaborator trait and its REST implementation
//! - [`db`]: SQLite implementation of the collaborator
//! - [`records`]: Implant record editing and photo attachments
//! - [`models`]: Wire types (Appointment, Patient, ImplantRecord, etc.)
//! - [`config`] and [`logging`]: Ambient setup

pub mod backend;
pub mod calendar;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod records;
pub mod schedule;

// Re-export commonly used types
pub use backend::{ClinicBackend, HttpBackend, StoreError, StoreResult};
pub use calendar::{CalendarError, CalendarService, HolidaySet, WeekendRule};
pub use config::{ClinicConfig, ConfigError};
pub use db::Database;
pub use models::{
    Appointment, AppointmentStatus, Attachment, ImplantRecord, NewPatient, Patient, Slot,
    Track, TrackTag, TriState,
};
pub use records::{AttachmentSet, RecordEditor, RecordError};
pub use schedule::{Agenda, AppointmentStore, BookingDraft, EditDraft, SlotBoard, SlotGrid};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use picc_clinic_imaging::{render_payload, CropRect, ImageError, Rotation, Transform};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot full: {0}")]
    Capacity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<StoreError> for ClinicError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => ClinicError::Validation(msg),
            StoreError::Capacity(msg) => ClinicError::Capacity(msg),
            StoreError::NotFound(msg) => ClinicError::NotFound(msg),
            StoreError::Remote { message } => ClinicError::Remote(message),
        }
    }
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        ClinicError::Database(e.to_string())
    }
}

impl From<CalendarError> for ClinicError {
    fn from(e: CalendarError) -> Self {
        StoreError::from(e).into()
    }
}

impl From<ImageError> for ClinicError {
    fn from(e: ImageError) -> Self {
        ClinicError::Image(e.to_string())
    }
}

impl From<RecordError> for ClinicError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Store(inner) => inner.into(),
            RecordError::Image(inner) => inner.into(),
            other => ClinicError::NotFound(other.to_string()),
        }
    }
}

impl From<ConfigError> for ClinicError {
    fn from(e: ConfigError) -> Self {
        ClinicError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(e: serde_json::Error) -> Self {
        ClinicError::Validation(format!("Invalid JSON: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Remote(format!("Lock poisoned: {}", e))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ClinicError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ClinicError::Validation(format!("Invalid date: {}", value)))
}

fn parse_track(value: &str) -> Result<Track, ClinicError> {
    value.parse().map_err(ClinicError::Validation)
}

fn parse_status(value: &str) -> Result<AppointmentStatus, ClinicError> {
    AppointmentStatus::parse(value)
        .ok_or_else(|| ClinicError::Validation(format!("Unknown status: {}", value)))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the log subscriber. `RUST_LOG` takes precedence over `filter`.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    logging::init(filter.as_deref().unwrap_or(config::DEFAULT_LOG_FILTER))
}

/// Open or create the embedded clinic database at the given path.
#[uniffi::export]
pub fn open_clinic(path: String, config_json: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let config = ClinicConfig::from_json(&config_json)?;
    let db = Database::open(&path)?.with_slot_capacity(config.slot_capacity);
    ClinicCore::start(Box::new(db), config)
}

/// Embedded clinic database in memory (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory(config_json: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let config = ClinicConfig::from_json(&config_json)?;
    let db = Database::open_in_memory()?.with_slot_capacity(config.slot_capacity);
    ClinicCore::start(Box::new(db), config)
}

/// Talk to the clinic server at `api_base_url` (or `PICC_CLINIC_API_URL`).
#[uniffi::export]
pub fn open_clinic_remote(config_json: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let config = ClinicConfig::from_json(&config_json)?.with_env_overrides();
    let http = HttpBackend::new(&config.api_base_url, config.request_timeout_secs)?;
    ClinicCore::start(Box::new(http), config)
}

// =========================================================================
// Main API Object
// =========================================================================

type SharedBackend = Box<dyn ClinicBackend + Send>;

struct ClinicState {
    store: AppointmentStore<SharedBackend>,
    agenda: Agenda,
    patients: Vec<Patient>,
}

/// Thread-safe agenda wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    config: ClinicConfig,
    state: Mutex<ClinicState>,
}

impl ClinicCore {
    fn start(backend: SharedBackend, config: ClinicConfig) -> Result<Arc<Self>, ClinicError> {
        let mut store = AppointmentStore::new(backend, config.grid());
        let mut agenda = Agenda::open(config.calendar(), today());
        agenda.refresh(&mut store)?;
        tracing::info!(
            ambulatorio = %config.ambulatorio,
            date = %agenda.current_date(),
            "Clinic agenda opened"
        );
        Ok(Arc::new(Self {
            config,
            state: Mutex::new(ClinicState {
                store,
                agenda,
                patients: Vec::new(),
            }),
        }))
    }

    fn reload_patients(&self, state: &mut ClinicState) -> Result<(), ClinicError> {
        state.patients = state
            .store
            .backend()
            .list_patients(&self.config.ambulatorio, models::STATUS_IN_CARE)?;
        Ok(())
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Day Navigation
    // =========================================================================

    /// Displayed date, ISO format.
    pub fn current_date(&self) -> Result<String, ClinicError> {
        let state = self.state.lock()?;
        Ok(state.agenda.current_date().to_string())
    }

    /// Show `date` (any day) and reload its appointments.
    pub fn load_day(&self, date: String) -> Result<Vec<FfiAppointment>, ClinicError> {
        let date = parse_date(&date)?;
        let mut state = self.state.lock()?;
        let ClinicState { store, agenda, .. } = &mut *state;
        agenda.go_to(date);
        agenda.refresh(store)?;
        let appointments = store.appointments_on(date)?;
        Ok(appointments.iter().cloned().map(|a| a.into()).collect())
    }

    pub fn go_today(&self) -> Result<String, ClinicError> {
        let mut state = self.state.lock()?;
        let ClinicState { store, agenda, .. } = &mut *state;
        agenda.go_today(today())?;
        agenda.refresh(store)?;
        Ok(agenda.current_date().to_string())
    }

    pub fn go_next(&self) -> Result<String, ClinicError> {
        let mut state = self.state.lock()?;
        let ClinicState { store, agenda, .. } = &mut *state;
        agenda.go_next()?;
        agenda.refresh(store)?;
        Ok(agenda.current_date().to_string())
    }

    pub fn go_previous(&self) -> Result<String, ClinicError> {
        let mut state = self.state.lock()?;
        let ClinicState { store, agenda, .. } = &mut *state;
        agenda.go_prev()?;
        agenda.refresh(store)?;
        Ok(agenda.current_date().to_string())
    }

    /// Replace the holidays of `year` (ISO date strings).
    pub fn set_holidays(&self, year: i32, dates: Vec<String>) -> Result<(), ClinicError> {
        let holidays = HolidaySet::from_iso_strings(year, &dates)?;
        let mut state = self.state.lock()?;
        state.agenda.set_holidays(holidays)?;
        Ok(())
    }

    pub fn slot_board(&self) -> Result<FfiSlotBoard, ClinicError> {
        let state = self.state.lock()?;
        Ok(state.agenda.board(&state.store).into())
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Book `patient_id` into a slot of the displayed day.
    pub fn create_appointment(
        &self,
        patient_id: String,
        time: String,
        track: String,
        services: Vec<String>,
    ) -> Result<FfiAppointment, ClinicError> {
        let slot = Slot::new(time, parse_track(&track)?);
        let mut state = self.state.lock()?;
        if !state.agenda.is_bookable() {
            return Err(ClinicError::Validation(format!(
                "{} is not a working day",
                state.agenda.current_date()
            )));
        }
        if !state.patients.iter().any(|p| p.id == patient_id) {
            self.reload_patients(&mut state)?;
        }
        let ClinicState {
            store,
            agenda,
            patients,
        } = &mut *state;
        let patient = patients.iter().find(|p| p.id == patient_id);
        let appointment = store.create(patient, agenda.current_date(), &slot, &services)?;
        Ok(appointment.into())
    }

    /// `status` is the wire value: `da_fare`, `effettuato` or `non_presentato`.
    pub fn set_appointment_status(
        &self,
        appointment_id: String,
        status: String,
    ) -> Result<FfiAppointment, ClinicError> {
        let status = parse_status(&status)?;
        let mut state = self.state.lock()?;
        Ok(state.store.transition(&appointment_id, status)?.into())
    }

    pub fn replace_services(
        &self,
        appointment_id: String,
        services: Vec<String>,
    ) -> Result<FfiAppointment, ClinicError> {
        let mut state = self.state.lock()?;
        Ok(state.store.replace_services(&appointment_id, &services)?.into())
    }

    pub fn delete_appointment(&self, appointment_id: String) -> Result<(), ClinicError> {
        let mut state = self.state.lock()?;
        state.store.delete(&appointment_id)?;
        Ok(())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Quick creation; the track tag follows `track`, PICC when absent.
    pub fn create_patient(
        &self,
        first_name: String,
        last_name: String,
        track: Option<String>,
    ) -> Result<FfiPatient, ClinicError> {
        let track = track.as_deref().map(parse_track).transpose()?;
        let request = NewPatient::quick(
            first_name.trim(),
            last_name.trim(),
            track,
            self.config.ambulatorio.clone(),
        );
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(ClinicError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let mut state = self.state.lock()?;
        let patient = state.store.backend().create_patient(&request)?;
        state.patients.push(patient.clone());
        Ok(patient.into())
    }

    /// Patients bookable into `track` whose name contains `query`.
    pub fn search_patients(
        &self,
        query: String,
        track: String,
    ) -> Result<Vec<FfiPatient>, ClinicError> {
        let track = parse_track(&track)?;
        let mut state = self.state.lock()?;
        self.reload_patients(&mut state)?;
        Ok(schedule::search_patients(&state.patients, &query, track)
            .into_iter()
            .cloned()
            .map(|p| p.into())
            .collect())
    }

    // =========================================================================
    // Implant Records
    // =========================================================================

    /// Records of a patient, as JSON objects in the API's shape.
    pub fn list_implant_records(&self, patient_id: String) -> Result<Vec<String>, ClinicError> {
        let state = self.state.lock()?;
        let records = state.store.backend().list_implant_records(&patient_id)?;
        records
            .iter()
            .map(|r| serde_json::to_string(r).map_err(ClinicError::from))
            .collect()
    }

    /// Create or update a record given as JSON; returns the saved record.
    pub fn save_implant_record(&self, record_json: String) -> Result<String, ClinicError> {
        let record: ImplantRecord = serde_json::from_str(&record_json)?;
        let state = self.state.lock()?;
        let mut editor = RecordEditor::open(record);
        let saved = editor.save(state.store.backend())?;
        Ok(serde_json::to_string(&saved)?)
    }

    pub fn delete_implant_record(&self, record_id: String) -> Result<(), ClinicError> {
        let state = self.state.lock()?;
        state.store.backend().delete_implant_record(&record_id)?;
        Ok(())
    }

    pub fn implant_record_pdf(&self, record_id: String) -> Result<Vec<u8>, ClinicError> {
        let state = self.state.lock()?;
        Ok(state.store.backend().implant_record_pdf(&record_id)?)
    }

    // =========================================================================
    // Attachment Editing
    // =========================================================================

    /// Render an attachment payload through a transform. Used for both the
    /// live preview and the committed image.
    pub fn render_attachment(
        &self,
        payload: String,
        transform: FfiTransform,
    ) -> Result<FfiRenderedImage, ClinicError> {
        let transform = Transform::try_from(transform)?;
        let rendered = render_payload(&payload, &transform, &self.config.render_options())?;
        Ok(FfiRenderedImage {
            payload: rendered.to_payload(),
            width: rendered.width,
            height: rendered.height,
        })
    }
}

// =========================================================================
// FFI-Safe Types
// =========================================================================

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub badge: String,
    pub date: String,
    pub time: String,
    pub track: String,
    pub status: String,
    /// "neutral", "affirmative" or "negative"
    pub tone: String,
    pub services: Vec<String>,
}

impl From<Appointment> for FfiAppointment {
    fn from(a: Appointment) -> Self {
        let tone = match a.status.tone() {
            schedule::DisplayTone::Neutral => "neutral",
            schedule::DisplayTone::Affirmative => "affirmative",
            schedule::DisplayTone::Negative => "negative",
        };
        Self {
            patient_name: a.patient_display_name(),
            badge: a.badge(),
            date: a.date.to_string(),
            track: a.track.to_string(),
            status: a.status.as_str().to_string(),
            tone: tone.to_string(),
            id: a.id,
            patient_id: a.patient_id,
            time: a.time,
            services: a.services,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    /// "PICC", "MED" or "PICC_MED"
    pub track_tag: String,
}

impl From<Patient> for FfiPatient {
    fn from(p: Patient) -> Self {
        let track_tag = match p.track_tag {
            TrackTag::Picc => "PICC",
            TrackTag::Med => "MED",
            TrackTag::PiccMed => "PICC_MED",
        };
        Self {
            display_name: p.display_name(),
            track_tag: track_tag.to_string(),
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
        }
    }
}

/// FFI-safe board cell.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSlotCell {
    pub time: String,
    pub track: String,
    pub appointments: Vec<FfiAppointment>,
    pub remaining: u32,
    pub can_add: bool,
}

/// FFI-safe slot board, time-major.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSlotBoard {
    pub date: String,
    pub working_day: bool,
    pub tracks: Vec<String>,
    pub cells: Vec<FfiSlotCell>,
}

impl From<SlotBoard> for FfiSlotBoard {
    fn from(board: SlotBoard) -> Self {
        let cells = board
            .rows
            .into_iter()
            .flat_map(|row| row.cells)
            .map(|cell| FfiSlotCell {
                time: cell.slot.time,
                track: cell.slot.track.to_string(),
                appointments: cell.appointments.into_iter().map(|a| a.into()).collect(),
                remaining: cell.remaining as u32,
                can_add: cell.can_add,
            })
            .collect();
        Self {
            date: board.date.to_string(),
            working_day: board.working_day,
            tracks: board.tracks.iter().map(|t| t.to_string()).collect(),
            cells,
        }
    }
}

/// FFI-safe crop rectangle, in source pixels.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// FFI-safe pending edit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransform {
    /// 0, 90, 180 or 270
    pub rotation_degrees: i32,
    pub zoom: f64,
    pub crop: Option<FfiCropRect>,
}

impl TryFrom<FfiTransform> for Transform {
    type Error = ClinicError;

    fn try_from(t: FfiTransform) -> Result<Self, Self::Error> {
        let rotation = Rotation::from_degrees(t.rotation_degrees).ok_or_else(|| {
            ClinicError::Validation(format!("Unsupported rotation: {}", t.rotation_degrees))
        })?;
        let mut transform = Transform {
            rotation,
            ..Transform::default()
        };
        transform.set_zoom(t.zoom);
        if let Some(c) = t.crop {
            transform.set_crop(CropRect::new(c.x, c.y, c.width, c.height));
        }
        Ok(transform)
    }
}

/// FFI-safe render result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRenderedImage {
    /// Base64 JPEG without a `data:` prefix
    pub payload: String,
    pub width: u32,
    pub height: u32,
}
