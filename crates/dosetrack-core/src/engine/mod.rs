//! Dose logging engine and the shared operation error taxonomy.

mod consumption;
mod dose_log;

pub use consumption::*;
pub use dose_log::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{CourseStatus, Medicine, Patient, TimeOfDay};

/// Operation errors surfaced to clients.
///
/// Every variant carries a stable machine code ([`EngineError::code`]) and an
/// HTTP status class ([`EngineError::status_code`]) so an embedding server can
/// render the wire contract directly. The two conflict-class errors stay
/// distinct: "already logged" and "out of stock" need different UI.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Ownership chain did not resolve to the caller
    #[error("{0}")]
    Forbidden(String),

    /// Linked course is paused or completed; the message names the state
    #[error("Cannot log dose. Treatment course is {status}")]
    CourseNotActive { status: CourseStatus },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient stock. Need {needed}, have {have}")]
    InsufficientStock { needed: f64, have: f64 },

    #[error("Dose already logged for {slot} on {date}")]
    DoseAlreadyLogged { slot: TimeOfDay, date: NaiveDate },

    #[error("Storage error: {0}")]
    Db(#[from] DbError),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Forbidden(_) => "FORBIDDEN",
            EngineError::CourseNotActive { .. } => "COURSE_NOT_ACTIVE",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            EngineError::DoseAlreadyLogged { .. } => "DOSE_ALREADY_LOGGED",
            EngineError::Db(_) => "STORAGE_ERROR",
        }
    }

    /// HTTP status class for an embedding server.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::Forbidden(_) | EngineError::CourseNotActive { .. } => 403,
            EngineError::NotFound(_) => 404,
            EngineError::InsufficientStock { .. } | EngineError::DoseAlreadyLogged { .. } => 409,
            EngineError::Db(_) => 500,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Db(DbError::Sqlite(e))
    }
}

/// Resolve patient → caregiver ownership.
pub(crate) fn verify_patient_ownership(
    db: &Database,
    caregiver_id: &str,
    patient_id: &str,
) -> EngineResult<Patient> {
    let patient = db
        .get_patient(patient_id)?
        .ok_or_else(|| EngineError::NotFound("Patient".into()))?;
    if !patient.is_owned_by(caregiver_id) {
        return Err(EngineError::Forbidden(
            "Unauthorized access to patient".into(),
        ));
    }
    Ok(patient)
}

/// Resolve medicine → patient → caregiver ownership.
pub(crate) fn verify_medicine_ownership(
    db: &Database,
    caregiver_id: &str,
    medicine_id: &str,
) -> EngineResult<(Medicine, Patient)> {
    let medicine = db
        .get_medicine(medicine_id)?
        .ok_or_else(|| EngineError::NotFound("Medicine".into()))?;
    let patient = verify_patient_ownership(db, caregiver_id, &medicine.patient_id)?;
    Ok((medicine, patient))
}
