//! DoseTrack Core Library
//!
//! Local-first medication adherence tracking for caregiver-managed patients.
//!
//! # Architecture
//!
//! ```text
//!                        log dose (medicine, slot, day, status)
//!                                        │
//!                          [ownership chain: caregiver → patient]
//!                                        │
//!                          [course guard: must be active]
//!                                        │
//!                    ┌───────────────────▼───────────────────┐
//!                    │        Dose Logging Engine            │
//!                    │  one transaction:                     │
//!                    │    counter CAS (stock | quota)        │
//!                    │    ledger append (unique slot/day)    │
//!                    └───────────────────┬───────────────────┘
//!                                        │
//!                    ┌───────────────────┼───────────────────┐
//!                    │                   │                   │
//!                    ▼                   ▼                   ▼
//!              Low-Stock            Adherence           Course
//!               Alerts               Reports           Completion
//! ```
//!
//! # Core Principle
//!
//! **The ledger's unique index on (medicine, slot, scheduled day) is the sole
//! idempotency arbiter.** Counter adjustments ride in the same transaction as
//! the ledger append, so a duplicate submission rolls its adjustment back and
//! surfaces a typed conflict.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage layer with the uniqueness-enforcing ledger
//! - [`models`]: Domain types (Patient, TreatmentCourse, Medicine, DoseLog, HealthLog)
//! - [`engine`]: Dose logging orchestration and consumption-model resolution
//! - [`services`]: Ownership-checked CRUD around the core
//! - [`reports`]: Adherence and vitals aggregation
//! - [`alerts`]: Low-stock notification seam

pub mod alerts;
pub mod db;
pub mod engine;
pub mod logging;
pub mod models;
pub mod reports;
pub mod services;

// Re-export commonly used types
pub use alerts::{LogAlertNotifier, LowStockNotifier};
pub use db::Database;
pub use engine::{
    ConsumptionModel, DoseEngine, DoseOutcome, DoseRequest, EngineError, EngineResult,
};
pub use models::{
    CourseKind, CourseStatus, Dose, DoseLog, DoseStatus, Gender, HealthLog, Inventory,
    MealRelation, MealTimings, Medicine, MedicineForm, Patient, ScheduleSlot, TimeOfDay,
    TreatmentCourse, VitalKind,
};
pub use reports::{AdherenceReport, DoseLogDetail, ReportAggregator, VitalSummary};
pub use services::{
    CourseService, CourseUpdate, HealthLogService, MedicineService, MedicineUpdate, NewCourse,
    NewHealthLog, NewMedicine, NewPatient, PatientService, PatientUpdate,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DoseTrackError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Dose already logged: {0}")]
    DoseAlreadyLogged(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<EngineError> for DoseTrackError {
    fn from(e: EngineError) -> Self {
        let message = e.to_string();
        match e {
            EngineError::Validation(_) => DoseTrackError::ValidationError(message),
            EngineError::Forbidden(_) | EngineError::CourseNotActive { .. } => {
                DoseTrackError::Forbidden(message)
            }
            EngineError::NotFound(_) => DoseTrackError::NotFound(message),
            EngineError::InsufficientStock { .. } => DoseTrackError::InsufficientStock(message),
            EngineError::DoseAlreadyLogged { .. } => DoseTrackError::DoseAlreadyLogged(message),
            EngineError::Db(_) => DoseTrackError::DatabaseError(message),
        }
    }
}

impl From<db::DbError> for DoseTrackError {
    fn from(e: db::DbError) -> Self {
        DoseTrackError::DatabaseError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DoseTrackError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DoseTrackError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Initialize tracing output for the host process.
#[uniffi::export]
pub fn init_logging() {
    logging::init();
}

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<DoseTrackCore>, DoseTrackError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(DoseTrackCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<DoseTrackCore>, DoseTrackError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(DoseTrackCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DoseTrackCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl DoseTrackCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a new patient under the caregiver account.
    pub fn create_patient(
        &self,
        caregiver_id: String,
        patient: FfiNewPatient,
    ) -> Result<FfiPatient, DoseTrackError> {
        let db = self.db.lock()?;
        let input = NewPatient {
            name: patient.name,
            age: patient.age,
            gender: parse_enum("gender", &patient.gender, Gender::parse)?,
            relation: patient.relation,
            avatar_url: patient.avatar_url,
            theme_color: patient.theme_color,
            meal_timings: patient.meal_timings.map(Into::into),
        };
        let created = PatientService::new(&db).create(&caregiver_id, input)?;
        Ok(created.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(
        &self,
        caregiver_id: String,
        patient_id: String,
    ) -> Result<FfiPatient, DoseTrackError> {
        let db = self.db.lock()?;
        let patient = PatientService::new(&db).get(&caregiver_id, &patient_id)?;
        Ok(patient.into())
    }

    /// List the caregiver's patients, newest first.
    pub fn list_patients(&self, caregiver_id: String) -> Result<Vec<FfiPatient>, DoseTrackError> {
        let db = self.db.lock()?;
        let patients = PatientService::new(&db).list(&caregiver_id)?;
        Ok(patients.into_iter().map(Into::into).collect())
    }

    /// Apply a partial patient update.
    pub fn update_patient(
        &self,
        caregiver_id: String,
        patient_id: String,
        update: FfiPatientUpdate,
    ) -> Result<FfiPatient, DoseTrackError> {
        let db = self.db.lock()?;
        let update = PatientUpdate {
            name: update.name,
            age: update.age,
            gender: update
                .gender
                .as_deref()
                .map(|g| parse_enum("gender", g, Gender::parse))
                .transpose()?,
            relation: update.relation,
            avatar_url: update.avatar_url,
            theme_color: update.theme_color,
            meal_timings: update.meal_timings.map(Into::into),
        };
        let patient = PatientService::new(&db).update(&caregiver_id, &patient_id, update)?;
        Ok(patient.into())
    }

    /// Soft-delete a patient.
    pub fn delete_patient(
        &self,
        caregiver_id: String,
        patient_id: String,
    ) -> Result<(), DoseTrackError> {
        let db = self.db.lock()?;
        PatientService::new(&db).delete(&caregiver_id, &patient_id)?;
        Ok(())
    }

    // =========================================================================
    // Treatment Course Operations
    // =========================================================================

    /// Create a treatment course for a patient.
    pub fn create_course(
        &self,
        caregiver_id: String,
        course: FfiNewCourse,
    ) -> Result<FfiCourse, DoseTrackError> {
        let db = self.db.lock()?;
        let input = NewCourse {
            patient_id: course.patient_id,
            name: course.name,
            kind: parse_enum("course kind", &course.kind, CourseKind::parse)?,
            duration_in_days: course.duration_in_days,
            start_date: parse_opt_datetime("start date", course.start_date)?,
            notes: course.notes,
        };
        let created = CourseService::new(&db).create(&caregiver_id, input)?;
        Ok(created.into())
    }

    /// List a patient's courses, newest first.
    pub fn list_courses(
        &self,
        caregiver_id: String,
        patient_id: String,
    ) -> Result<Vec<FfiCourse>, DoseTrackError> {
        let db = self.db.lock()?;
        let courses = CourseService::new(&db).list(&caregiver_id, &patient_id)?;
        Ok(courses.into_iter().map(Into::into).collect())
    }

    /// Apply a partial course update. Duration changes resize linked quotas.
    pub fn update_course(
        &self,
        caregiver_id: String,
        course_id: String,
        update: FfiCourseUpdate,
    ) -> Result<FfiCourse, DoseTrackError> {
        let db = self.db.lock()?;
        let update = CourseUpdate {
            name: update.name,
            status: update
                .status
                .as_deref()
                .map(|s| parse_enum("course status", s, CourseStatus::parse))
                .transpose()?,
            duration_in_days: update.duration_in_days,
            start_date: parse_opt_datetime("start date", update.start_date)?,
            notes: update.notes,
        };
        let course = CourseService::new(&db).update(&caregiver_id, &course_id, update)?;
        Ok(course.into())
    }

    /// Soft-delete a course and its linked medicines.
    pub fn delete_course(
        &self,
        caregiver_id: String,
        course_id: String,
    ) -> Result<(), DoseTrackError> {
        let db = self.db.lock()?;
        CourseService::new(&db).delete(&caregiver_id, &course_id)?;
        Ok(())
    }

    /// Opportunistic completion check for one course. Returns whether the
    /// course transitioned to `completed`.
    pub fn check_course_completion(&self, course_id: String) -> Result<bool, DoseTrackError> {
        let db = self.db.lock()?;
        Ok(CourseService::new(&db).check_completion(&course_id, Utc::now())?)
    }

    /// Sweep all active acute courses past their end date. Returns how many
    /// completed.
    pub fn complete_expired_courses(&self) -> Result<u32, DoseTrackError> {
        let db = self.db.lock()?;
        Ok(CourseService::new(&db).complete_expired(Utc::now())? as u32)
    }

    // =========================================================================
    // Medicine Operations
    // =========================================================================

    /// Create a medicine. Linking to an acute course sizes its quota.
    pub fn create_medicine(
        &self,
        caregiver_id: String,
        medicine: FfiNewMedicine,
    ) -> Result<FfiMedicine, DoseTrackError> {
        let db = self.db.lock()?;
        let input = NewMedicine {
            patient_id: medicine.patient_id,
            course_id: medicine.course_id,
            name: medicine.name,
            form: parse_enum("form", &medicine.form, MedicineForm::parse)?,
            dose: medicine.dose.into(),
            schedule: parse_schedule(medicine.schedule)?,
            stock: medicine.stock,
            low_stock_threshold: medicine.low_stock_threshold,
        };
        let created = MedicineService::new(&db).create(&caregiver_id, input)?;
        Ok(created.into())
    }

    /// Get an active medicine by ID.
    pub fn get_medicine(
        &self,
        caregiver_id: String,
        medicine_id: String,
    ) -> Result<FfiMedicine, DoseTrackError> {
        let db = self.db.lock()?;
        let medicine = MedicineService::new(&db).get(&caregiver_id, &medicine_id)?;
        Ok(medicine.into())
    }

    /// List a patient's active medicines, newest first.
    pub fn list_medicines(
        &self,
        caregiver_id: String,
        patient_id: String,
    ) -> Result<Vec<FfiMedicine>, DoseTrackError> {
        let db = self.db.lock()?;
        let medicines = MedicineService::new(&db).list(&caregiver_id, &patient_id)?;
        Ok(medicines.into_iter().map(Into::into).collect())
    }

    /// Apply a partial medicine update; quotas are kept in sync.
    pub fn update_medicine(
        &self,
        caregiver_id: String,
        medicine_id: String,
        update: FfiMedicineUpdate,
    ) -> Result<FfiMedicine, DoseTrackError> {
        let db = self.db.lock()?;
        let update = MedicineUpdate {
            name: update.name,
            form: update
                .form
                .as_deref()
                .map(|f| parse_enum("form", f, MedicineForm::parse))
                .transpose()?,
            dose: update.dose.map(Into::into),
            schedule: update.schedule.map(parse_schedule).transpose()?,
            course_id: update.course_id,
            stock: update.stock,
            low_stock_threshold: update.low_stock_threshold,
        };
        let medicine = MedicineService::new(&db).update(&caregiver_id, &medicine_id, update)?;
        Ok(medicine.into())
    }

    /// Soft-delete a medicine.
    pub fn delete_medicine(
        &self,
        caregiver_id: String,
        medicine_id: String,
    ) -> Result<(), DoseTrackError> {
        let db = self.db.lock()?;
        MedicineService::new(&db).delete(&caregiver_id, &medicine_id)?;
        Ok(())
    }

    // =========================================================================
    // Dose Logging
    // =========================================================================

    /// Log a dose event. Idempotent per (medicine, slot, calendar day):
    /// retries surface [`DoseTrackError::DoseAlreadyLogged`] instead of a
    /// second record, and the counter adjustment of the failed retry is
    /// rolled back.
    pub fn log_dose(
        &self,
        caregiver_id: String,
        request: FfiDoseRequest,
    ) -> Result<FfiDoseOutcome, DoseTrackError> {
        let mut db = self.db.lock()?;
        let request = DoseRequest {
            medicine_id: request.medicine_id,
            status: parse_enum("status", &request.status, DoseStatus::parse)?,
            slot: parse_enum("slot", &request.slot, TimeOfDay::parse)?,
            scheduled_for: parse_datetime("scheduled_for", &request.scheduled_for)?,
            taken_at: parse_opt_datetime("taken_at", request.taken_at)?,
            notes: request.notes,
        };
        let outcome = DoseEngine::new(&mut db).log_dose(&caregiver_id, &request)?;
        Ok(outcome.into())
    }

    /// A patient's dose logs, newest first, optionally range-filtered.
    pub fn get_dose_logs(
        &self,
        caregiver_id: String,
        patient_id: String,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<FfiDoseLog>, DoseTrackError> {
        let mut db = self.db.lock()?;
        let start = parse_opt_datetime("start date", start_date)?;
        let end = parse_opt_datetime("end date", end_date)?;
        let logs = DoseEngine::new(&mut db).dose_logs(&caregiver_id, &patient_id, start, end)?;
        Ok(logs.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Health Logging
    // =========================================================================

    /// Record a vital measurement.
    pub fn log_vital(
        &self,
        caregiver_id: String,
        log: FfiNewHealthLog,
    ) -> Result<FfiHealthLog, DoseTrackError> {
        let db = self.db.lock()?;
        let input = NewHealthLog {
            patient_id: log.patient_id,
            vital: parse_enum("vital", &log.vital, VitalKind::parse)?,
            value: log.value,
            unit: log.unit,
            notes: log.notes,
            recorded_at: parse_datetime("recorded_at", &log.recorded_at)?,
        };
        let created = HealthLogService::new(&db).create(&caregiver_id, input)?;
        Ok(created.into())
    }

    /// A patient's vital measurements, newest first, optionally filtered.
    pub fn get_health_logs(
        &self,
        caregiver_id: String,
        patient_id: String,
        vital: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<FfiHealthLog>, DoseTrackError> {
        let db = self.db.lock()?;
        let vital = vital
            .as_deref()
            .map(|v| parse_enum("vital", v, VitalKind::parse))
            .transpose()?;
        let start = parse_opt_datetime("start date", start_date)?;
        let end = parse_opt_datetime("end date", end_date)?;
        let logs = HealthLogService::new(&db).list(&caregiver_id, &patient_id, vital, start, end)?;
        Ok(logs.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Adherence counts over a date range, optionally per course.
    pub fn adherence_report(
        &self,
        caregiver_id: String,
        patient_id: String,
        start_date: String,
        end_date: String,
        course_id: Option<String>,
    ) -> Result<FfiAdherenceReport, DoseTrackError> {
        let db = self.db.lock()?;
        let start = parse_datetime("start date", &start_date)?;
        let end = parse_datetime("end date", &end_date)?;
        let report = ReportAggregator::new(&db).adherence(
            &caregiver_id,
            &patient_id,
            start,
            end,
            course_id.as_deref(),
        )?;
        Ok(report.into())
    }

    /// Detailed dose rows for report rendering, newest first.
    pub fn dose_report_details(
        &self,
        caregiver_id: String,
        patient_id: String,
        start_date: String,
        end_date: String,
        course_id: Option<String>,
    ) -> Result<Vec<FfiDoseLogDetail>, DoseTrackError> {
        let db = self.db.lock()?;
        let start = parse_datetime("start date", &start_date)?;
        let end = parse_datetime("end date", &end_date)?;
        let details = ReportAggregator::new(&db).dose_log_details(
            &caregiver_id,
            &patient_id,
            start,
            end,
            course_id.as_deref(),
        )?;
        Ok(details.into_iter().map(Into::into).collect())
    }

    /// Per-vital aggregates over a date range.
    pub fn health_summary(
        &self,
        caregiver_id: String,
        patient_id: String,
        vital: Option<String>,
        start_date: String,
        end_date: String,
    ) -> Result<Vec<FfiVitalSummary>, DoseTrackError> {
        let db = self.db.lock()?;
        let vital = vital
            .as_deref()
            .map(|v| parse_enum("vital", v, VitalKind::parse))
            .transpose()?;
        let start = parse_datetime("start date", &start_date)?;
        let end = parse_datetime("end date", &end_date)?;
        let summaries = ReportAggregator::new(&db).health_summary(
            &caregiver_id,
            &patient_id,
            vital,
            start,
            end,
        )?;
        Ok(summaries.into_iter().map(Into::into).collect())
    }
}

// =========================================================================
// FFI Helpers
// =========================================================================

fn parse_enum<T>(
    field: &str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, DoseTrackError> {
    parse(value)
        .ok_or_else(|| DoseTrackError::ValidationError(format!("invalid {} '{}'", field, value)))
}

fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>, DoseTrackError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| {
            DoseTrackError::ValidationError(format!(
                "invalid {} '{}', expected RFC 3339",
                field, value
            ))
        })
}

fn parse_opt_datetime(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DoseTrackError> {
    value.as_deref().map(|v| parse_datetime(field, v)).transpose()
}

fn parse_schedule(slots: Vec<FfiScheduleSlot>) -> Result<Vec<ScheduleSlot>, DoseTrackError> {
    slots
        .into_iter()
        .map(|slot| {
            Ok(ScheduleSlot {
                time_of_day: parse_enum("slot", &slot.time_of_day, TimeOfDay::parse)?,
                meal_relation: slot
                    .meal_relation
                    .as_deref()
                    .map(|m| parse_enum("meal relation", m, MealRelation::parse))
                    .transpose()?,
                quantity: slot.quantity,
                reminder_time: slot.reminder_time,
            })
        })
        .collect()
}

fn format_datetime(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe meal timings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMealTimings {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

impl From<FfiMealTimings> for MealTimings {
    fn from(t: FfiMealTimings) -> Self {
        MealTimings {
            breakfast: t.breakfast,
            lunch: t.lunch,
            dinner: t.dinner,
        }
    }
}

impl From<MealTimings> for FfiMealTimings {
    fn from(t: MealTimings) -> Self {
        Self {
            breakfast: t.breakfast,
            lunch: t.lunch,
            dinner: t.dinner,
        }
    }
}

/// FFI-safe patient creation input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub relation: String,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub meal_timings: Option<FfiMealTimings>,
}

/// FFI-safe partial patient update.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub relation: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub meal_timings: Option<FfiMealTimings>,
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub caregiver_id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub relation: String,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub meal_timings: Option<FfiMealTimings>,
}

impl From<Patient> for FfiPatient {
    fn from(p: Patient) -> Self {
        Self {
            patient_id: p.patient_id,
            caregiver_id: p.caregiver_id,
            name: p.name,
            age: p.age,
            gender: p.gender.as_str().to_string(),
            relation: p.relation,
            avatar_url: p.avatar_url,
            theme_color: p.theme_color,
            meal_timings: p.meal_timings.map(Into::into),
        }
    }
}

/// FFI-safe course creation input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCourse {
    pub patient_id: String,
    pub name: String,
    pub kind: String,
    pub duration_in_days: Option<u32>,
    pub start_date: Option<String>,
    pub notes: Option<String>,
}

/// FFI-safe partial course update.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCourseUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
    pub duration_in_days: Option<u32>,
    pub start_date: Option<String>,
    pub notes: Option<String>,
}

/// FFI-safe treatment course.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCourse {
    pub course_id: String,
    pub patient_id: String,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub duration_in_days: Option<u32>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

impl From<TreatmentCourse> for FfiCourse {
    fn from(c: TreatmentCourse) -> Self {
        Self {
            course_id: c.course_id,
            patient_id: c.patient_id,
            name: c.name,
            kind: c.kind.as_str().to_string(),
            status: c.status.as_str().to_string(),
            duration_in_days: c.duration_in_days,
            start_date: format_datetime(&c.start_date),
            end_date: c.end_date.as_ref().map(format_datetime),
            notes: c.notes,
        }
    }
}

/// FFI-safe dose configuration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDose {
    pub strength: Option<String>,
    pub quantity_per_dose: f64,
    pub unit: String,
}

impl From<FfiDose> for Dose {
    fn from(d: FfiDose) -> Self {
        Dose {
            strength: d.strength,
            quantity_per_dose: d.quantity_per_dose,
            unit: d.unit,
        }
    }
}

impl From<Dose> for FfiDose {
    fn from(d: Dose) -> Self {
        Self {
            strength: d.strength,
            quantity_per_dose: d.quantity_per_dose,
            unit: d.unit,
        }
    }
}

/// FFI-safe intake slot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduleSlot {
    pub time_of_day: String,
    pub meal_relation: Option<String>,
    pub quantity: Option<f64>,
    pub reminder_time: Option<String>,
}

impl From<ScheduleSlot> for FfiScheduleSlot {
    fn from(s: ScheduleSlot) -> Self {
        Self {
            time_of_day: s.time_of_day.as_str().to_string(),
            meal_relation: s.meal_relation.map(|m| m.as_str().to_string()),
            quantity: s.quantity,
            reminder_time: s.reminder_time,
        }
    }
}

/// FFI-safe medicine creation input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedicine {
    pub patient_id: String,
    pub course_id: Option<String>,
    pub name: String,
    pub form: String,
    pub dose: FfiDose,
    pub schedule: Vec<FfiScheduleSlot>,
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
}

/// FFI-safe partial medicine update.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineUpdate {
    pub name: Option<String>,
    pub form: Option<String>,
    pub dose: Option<FfiDose>,
    pub schedule: Option<Vec<FfiScheduleSlot>>,
    pub course_id: Option<String>,
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
}

/// FFI-safe medicine with flattened counters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub medicine_id: String,
    pub patient_id: String,
    pub course_id: Option<String>,
    pub name: String,
    pub form: String,
    pub dose: FfiDose,
    pub schedule: Vec<FfiScheduleSlot>,
    /// "stock" or "quota"
    pub consumption_model: String,
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
    pub total_quantity_required: Option<f64>,
    pub consumed_quantity: Option<f64>,
}

impl From<Medicine> for FfiMedicine {
    fn from(m: Medicine) -> Self {
        let (model, stock, threshold, total, consumed) = match m.inventory {
            Inventory::Stock {
                on_hand,
                low_stock_threshold,
            } => ("stock", Some(on_hand), Some(low_stock_threshold), None, None),
            Inventory::Quota {
                total_required,
                consumed,
            } => ("quota", None, None, Some(total_required), Some(consumed)),
        };
        Self {
            medicine_id: m.medicine_id,
            patient_id: m.patient_id,
            course_id: m.course_id,
            name: m.name,
            form: m.form.as_str().to_string(),
            dose: m.dose.into(),
            schedule: m.schedule.into_iter().map(Into::into).collect(),
            consumption_model: model.to_string(),
            stock,
            low_stock_threshold: threshold,
            total_quantity_required: total,
            consumed_quantity: consumed,
        }
    }
}

/// FFI-safe dose log submission.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseRequest {
    pub medicine_id: String,
    pub status: String,
    pub slot: String,
    pub scheduled_for: String,
    pub taken_at: Option<String>,
    pub notes: Option<String>,
}

/// FFI-safe dose log entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseLog {
    pub log_id: String,
    pub medicine_id: String,
    pub patient_id: String,
    pub status: String,
    pub slot: String,
    pub scheduled_for: String,
    pub taken_at: Option<String>,
    pub notes: Option<String>,
}

impl From<DoseLog> for FfiDoseLog {
    fn from(l: DoseLog) -> Self {
        Self {
            log_id: l.log_id,
            medicine_id: l.medicine_id,
            patient_id: l.patient_id,
            status: l.status.as_str().to_string(),
            slot: l.slot.as_str().to_string(),
            scheduled_for: format_datetime(&l.scheduled_for),
            taken_at: l.taken_at.as_ref().map(format_datetime),
            notes: l.notes,
        }
    }
}

/// FFI-safe dose log result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseOutcome {
    pub log: FfiDoseLog,
    pub low_stock: bool,
}

impl From<DoseOutcome> for FfiDoseOutcome {
    fn from(o: DoseOutcome) -> Self {
        Self {
            log: o.log.into(),
            low_stock: o.low_stock,
        }
    }
}

/// FFI-safe health log input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewHealthLog {
    pub patient_id: String,
    pub vital: String,
    pub value: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub recorded_at: String,
}

/// FFI-safe health log entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHealthLog {
    pub log_id: String,
    pub patient_id: String,
    pub vital: String,
    pub value: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub recorded_at: String,
}

impl From<HealthLog> for FfiHealthLog {
    fn from(l: HealthLog) -> Self {
        Self {
            log_id: l.log_id,
            patient_id: l.patient_id,
            vital: l.vital.as_str().to_string(),
            value: l.value,
            unit: l.unit,
            notes: l.notes,
            recorded_at: format_datetime(&l.recorded_at),
        }
    }
}

/// FFI-safe adherence report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdherenceReport {
    pub total: i64,
    pub taken: i64,
    pub skipped: i64,
    pub missed: i64,
    pub adherence_percentage: f64,
}

impl From<AdherenceReport> for FfiAdherenceReport {
    fn from(r: AdherenceReport) -> Self {
        Self {
            total: r.total,
            taken: r.taken,
            skipped: r.skipped,
            missed: r.missed,
            adherence_percentage: r.adherence_percentage,
        }
    }
}

/// FFI-safe dose report row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseLogDetail {
    pub date: String,
    pub slot: String,
    pub medicine_name: String,
    pub status: String,
    pub taken_at: Option<String>,
}

impl From<DoseLogDetail> for FfiDoseLogDetail {
    fn from(d: DoseLogDetail) -> Self {
        Self {
            date: format_datetime(&d.date),
            slot: d.slot.as_str().to_string(),
            medicine_name: d.medicine_name,
            status: d.status.as_str().to_string(),
            taken_at: d.taken_at.as_ref().map(format_datetime),
        }
    }
}

/// FFI-safe vital summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVitalSummary {
    pub vital: String,
    pub count: i64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl From<VitalSummary> for FfiVitalSummary {
    fn from(s: VitalSummary) -> Self {
        Self {
            vital: s.vital.as_str().to_string(),
            count: s.count,
            min: s.min,
            max: s.max,
            avg: s.avg,
        }
    }
}
