//! Appointment status lifecycle.
//!
//! Every status is reachable from every other in one step so staff can undo
//! a wrong mark. The machine labels outcomes for display; it forbids nothing.

use serde::{Deserialize, Serialize};

use crate::models::{Appointment, AppointmentStatus};

/// How a status is rendered in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayTone {
    /// Dark badge
    Neutral,
    /// Green badge
    Affirmative,
    /// Red badge
    Negative,
}

impl AppointmentStatus {
    pub fn tone(&self) -> DisplayTone {
        match self {
            AppointmentStatus::Pending => DisplayTone::Neutral,
            AppointmentStatus::Done => DisplayTone::Affirmative,
            AppointmentStatus::NoShow => DisplayTone::Negative,
        }
    }

    pub fn can_transition_to(&self, _next: AppointmentStatus) -> bool {
        true
    }

    /// Statuses offered as buttons when editing an appointment in this status.
    pub fn reachable(&self) -> Vec<AppointmentStatus> {
        AppointmentStatus::ALL
            .into_iter()
            .filter(|s| s != self && self.can_transition_to(*s))
            .collect()
    }
}

/// A status change applied to one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
}

impl StatusTransition {
    pub fn new(from: AppointmentStatus, to: AppointmentStatus) -> Self {
        Self { from, to }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Apply to `appointment`. Only the status changes.
    pub fn apply(&self, appointment: &Appointment) -> Appointment {
        Appointment {
            status: self.to,
            ..appointment.clone()
        }
    }
}
