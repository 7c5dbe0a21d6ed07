//! Vote pipeline domain logic: ungrouping and the voter tally.

pub mod in_flight;
pub mod ungroup;
pub mod voter;

pub use in_flight::InFlight;
pub use ungroup::{ungroup, Checked, Ungrouped};
pub use voter::Voter;
