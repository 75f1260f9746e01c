//! Health vital logging.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::engine::{verify_patient_ownership, EngineError, EngineResult};
use crate::models::{HealthLog, VitalKind};

/// Input for recording a measurement.
#[derive(Debug, Clone)]
pub struct NewHealthLog {
    pub patient_id: String,
    pub vital: VitalKind,
    pub value: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

pub struct HealthLogService<'a> {
    db: &'a Database,
}

impl<'a> HealthLogService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, caregiver_id: &str, input: NewHealthLog) -> EngineResult<HealthLog> {
        verify_patient_ownership(self.db, caregiver_id, &input.patient_id)?;
        if input.unit.trim().is_empty() {
            return Err(EngineError::Validation("unit is required".into()));
        }

        let mut log = HealthLog::new(
            input.patient_id,
            input.vital,
            input.value,
            input.unit,
            input.recorded_at,
        );
        log.notes = input.notes;

        self.db.insert_health_log(&log)?;
        Ok(log)
    }

    pub fn list(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        vital: Option<VitalKind>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<HealthLog>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;
        Ok(self.db.list_health_logs(patient_id, vital, start, end)?)
    }
}
