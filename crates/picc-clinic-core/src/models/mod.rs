//! Domain models for the clinic agenda and implant records.

mod appointment;
mod attachment;
mod implant;
mod patient;
mod slot;

pub use appointment::*;
pub use attachment::*;
pub use implant::*;
pub use patient::*;
pub use slot::*;
