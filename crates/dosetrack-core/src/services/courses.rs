//! Treatment course lifecycle: CRUD, quota synchronization, completion.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::engine::{verify_patient_ownership, EngineError, EngineResult};
use crate::models::{CourseKind, CourseStatus, TreatmentCourse};

/// Input for creating a course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub patient_id: String,
    pub name: String,
    pub kind: CourseKind,
    /// Required for acute courses
    pub duration_in_days: Option<u32>,
    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Partial course update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub status: Option<CourseStatus>,
    pub duration_in_days: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub struct CourseService<'a> {
    db: &'a Database,
}

impl<'a> CourseService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, caregiver_id: &str, input: NewCourse) -> EngineResult<TreatmentCourse> {
        verify_patient_ownership(self.db, caregiver_id, &input.patient_id)?;

        if input.name.trim().is_empty() {
            return Err(EngineError::Validation("course name is required".into()));
        }
        match (input.kind, input.duration_in_days) {
            (CourseKind::Acute, None) => {
                return Err(EngineError::Validation(
                    "duration is required for acute treatment courses".into(),
                ))
            }
            (CourseKind::Acute, Some(0)) => {
                return Err(EngineError::Validation(
                    "duration must be positive".into(),
                ))
            }
            (CourseKind::Chronic, Some(_)) => {
                return Err(EngineError::Validation(
                    "duration only applies to acute treatment courses".into(),
                ))
            }
            _ => {}
        }

        let mut course = TreatmentCourse::new(
            input.patient_id,
            input.name,
            input.kind,
            input.duration_in_days,
            input.start_date.unwrap_or_else(Utc::now),
        );
        course.notes = input.notes;

        self.db.insert_course(&course)?;
        Ok(course)
    }

    pub fn list(&self, caregiver_id: &str, patient_id: &str) -> EngineResult<Vec<TreatmentCourse>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;
        Ok(self.db.list_courses_for_patient(patient_id)?)
    }

    pub fn get(&self, caregiver_id: &str, course_id: &str) -> EngineResult<TreatmentCourse> {
        let course = self
            .db
            .get_course(course_id)?
            .ok_or_else(|| EngineError::NotFound("Treatment course".into()))?;
        verify_patient_ownership(self.db, caregiver_id, &course.patient_id)?;
        Ok(course)
    }

    /// Update a course. A duration change on an acute course re-derives the
    /// end date and resizes every linked medicine's quota, preserving what
    /// has already been consumed.
    pub fn update(
        &self,
        caregiver_id: &str,
        course_id: &str,
        update: CourseUpdate,
    ) -> EngineResult<TreatmentCourse> {
        let mut course = self.get(caregiver_id, course_id)?;

        let duration_changed = matches!(
            update.duration_in_days,
            Some(d) if Some(d) != course.duration_in_days
        );
        if duration_changed && course.kind == CourseKind::Chronic {
            return Err(EngineError::Validation(
                "duration only applies to acute treatment courses".into(),
            ));
        }
        if matches!(update.duration_in_days, Some(0)) {
            return Err(EngineError::Validation("duration must be positive".into()));
        }

        if let Some(name) = update.name {
            course.name = name;
        }
        if let Some(status) = update.status {
            course.status = status;
        }
        if let Some(duration) = update.duration_in_days {
            course.duration_in_days = Some(duration);
        }
        if let Some(start_date) = update.start_date {
            course.start_date = start_date;
        }
        if let Some(notes) = update.notes {
            course.notes = Some(notes);
        }
        course.derive_end_date();

        if duration_changed {
            let duration = course.duration_in_days.unwrap_or(0);
            for med in self.db.list_medicines_for_course(course_id)? {
                let total = med.dose.quantity_per_dose
                    * med.slots_per_day() as f64
                    * f64::from(duration);
                self.db.set_quota(&med.medicine_id, total)?;
            }
            tracing::info!(
                "resized quotas for course {} to {} days",
                course_id,
                duration
            );
        }

        self.db.update_course(&course)?;
        Ok(course)
    }

    /// Soft-delete a course and cascade to its linked medicines.
    pub fn delete(&self, caregiver_id: &str, course_id: &str) -> EngineResult<()> {
        self.get(caregiver_id, course_id)?;

        self.db.soft_delete_course(course_id)?;
        for med in self.db.list_medicines_for_course(course_id)? {
            self.db.soft_delete_medicine(&med.medicine_id)?;
        }
        Ok(())
    }

    /// Transition an active acute course to `completed` when its time window
    /// elapsed or every linked medicine finished its quota.
    ///
    /// Runs off the dose-logging hot path and is safe to call redundantly.
    /// Returns whether a transition happened.
    pub fn check_completion(&self, course_id: &str, now: DateTime<Utc>) -> EngineResult<bool> {
        let Some(course) = self.db.get_course(course_id)? else {
            return Ok(false);
        };
        if course.kind != CourseKind::Acute || course.status != CourseStatus::Active {
            return Ok(false);
        }

        let medicines = self.db.list_medicines_for_course(course_id)?;
        let time_expired = course.is_expired(now);
        let dosage_finished =
            !medicines.is_empty() && medicines.iter().all(|m| m.inventory.is_exhausted());

        if time_expired || dosage_finished {
            self.db
                .set_course_status(course_id, CourseStatus::Completed)?;
            tracing::info!(
                "course {} completed ({})",
                course_id,
                if time_expired { "time" } else { "dosage" }
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Sweep all active acute courses whose end date has passed.
    pub fn complete_expired(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let mut completed = 0;
        for course in self.db.list_expired_acute_courses(now)? {
            if self.check_completion(&course.course_id, now)? {
                completed += 1;
            }
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Patient};
    use chrono::TimeZone;

    const CAREGIVER: &str = "caregiver-1";

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(
            CAREGIVER.into(),
            "Grandpa".into(),
            80,
            Gender::Male,
            "Grandfather".into(),
        );
        db.insert_patient(&patient).unwrap();
        (db, patient.patient_id)
    }

    fn acute(patient_id: &str, days: u32) -> NewCourse {
        NewCourse {
            patient_id: patient_id.into(),
            name: "Typhoid".into(),
            kind: CourseKind::Acute,
            duration_in_days: Some(days),
            start_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            notes: None,
        }
    }

    #[test]
    fn test_create_acute_requires_duration() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let mut input = acute(&patient_id, 7);
        input.duration_in_days = None;
        let err = svc.create(CAREGIVER, input).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_create_chronic_rejects_duration() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let input = NewCourse {
            patient_id: patient_id.clone(),
            name: "Hypertension".into(),
            kind: CourseKind::Chronic,
            duration_in_days: Some(30),
            start_date: None,
            notes: None,
        };
        assert!(svc.create(CAREGIVER, input).is_err());
    }

    #[test]
    fn test_duration_update_rederives_end_date() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let course = svc.create(CAREGIVER, acute(&patient_id, 7)).unwrap();
        let updated = svc
            .update(
                CAREGIVER,
                &course.course_id,
                CourseUpdate {
                    duration_in_days: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            updated.end_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_foreign_caregiver_cannot_touch_course() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let course = svc.create(CAREGIVER, acute(&patient_id, 7)).unwrap();
        let err = svc.get("caregiver-2", &course.course_id).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn test_completion_is_idempotent_on_expiry() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let course = svc.create(CAREGIVER, acute(&patient_id, 7)).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        assert!(svc.check_completion(&course.course_id, later).unwrap());
        // Already completed: nothing to do.
        assert!(!svc.check_completion(&course.course_id, later).unwrap());

        let course = svc.get(CAREGIVER, &course.course_id).unwrap();
        assert_eq!(course.status, CourseStatus::Completed);
    }

    #[test]
    fn test_completion_ignores_running_course() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        let course = svc.create(CAREGIVER, acute(&patient_id, 7)).unwrap();
        let midway = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert!(!svc.check_completion(&course.course_id, midway).unwrap());
    }

    #[test]
    fn test_complete_expired_sweep() {
        let (db, patient_id) = setup();
        let svc = CourseService::new(&db);

        svc.create(CAREGIVER, acute(&patient_id, 3)).unwrap();
        svc.create(CAREGIVER, acute(&patient_id, 60)).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(svc.complete_expired(now).unwrap(), 1);
        assert_eq!(svc.complete_expired(now).unwrap(), 0);
    }
}
