//! Domain models for DoseTrack.

mod patient;
mod course;
mod medicine;
mod dose_log;
mod health_log;

pub use patient::*;
pub use course::*;
pub use medicine::*;
pub use dose_log::*;
pub use health_log::*;
