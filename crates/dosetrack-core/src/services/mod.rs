//! Ownership-checked CRUD services around the dose logging core.

mod patients;
mod courses;
mod medicines;
mod health_logs;

pub use patients::*;
pub use courses::*;
pub use medicines::*;
pub use health_logs::*;
