//! Daily agenda: slot grid, appointment lifecycle, day store and dialogs.

mod agenda;
mod booking;
mod grid;
mod lifecycle;
mod store;

pub use agenda::*;
pub use booking::*;
pub use grid::*;
pub use lifecycle::*;
pub use store::*;
