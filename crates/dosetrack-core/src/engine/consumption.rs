//! Consumption-model resolution and the course-state guard.

use crate::db::Database;
use crate::models::{CourseKind, CourseStatus, Medicine};

use super::{EngineError, EngineResult};

/// How logging a taken dose affects a medicine's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionModel {
    /// Decrement on-hand stock (standalone medicine or chronic course)
    StockBased,
    /// Consume a fixed course quota (acute course)
    QuotaBased,
}

/// Outcome of resolving a medicine's course link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCourse {
    pub model: ConsumptionModel,
    /// Present iff the medicine is linked to a course
    pub status: Option<CourseStatus>,
}

impl ResolvedCourse {
    /// Dose logging is only permitted while a linked course is active.
    pub fn ensure_loggable(&self) -> EngineResult<()> {
        match self.status {
            Some(status) if status != CourseStatus::Active => {
                Err(EngineError::CourseNotActive { status })
            }
            _ => Ok(()),
        }
    }
}

/// Classify a medicine's consumption model from its course link.
///
/// Standalone medicines are stock-based. A dangling link (course missing or
/// soft-deleted) fails rather than silently falling back to stock.
pub fn resolve(db: &Database, medicine: &Medicine) -> EngineResult<ResolvedCourse> {
    let Some(course_id) = medicine.course_id.as_deref() else {
        return Ok(ResolvedCourse {
            model: ConsumptionModel::StockBased,
            status: None,
        });
    };

    let course = db
        .get_course(course_id)?
        .ok_or_else(|| EngineError::NotFound("Linked treatment course".into()))?;

    let model = match course.kind {
        CourseKind::Acute => ConsumptionModel::QuotaBased,
        CourseKind::Chronic => ConsumptionModel::StockBased,
    };

    Ok(ResolvedCourse {
        model,
        status: Some(course.status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dose, Gender, MedicineForm, Patient, ScheduleSlot, TimeOfDay, TreatmentCourse};
    use chrono::Utc;

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(
            "caregiver-1".into(),
            "Grandpa".into(),
            80,
            Gender::Male,
            "Grandfather".into(),
        );
        db.insert_patient(&patient).unwrap();
        (db, patient.patient_id)
    }

    fn make_medicine(patient_id: &str, course_id: Option<String>) -> Medicine {
        let mut med = Medicine::new(
            patient_id.into(),
            "Amoxicillin".into(),
            MedicineForm::Tablet,
            Dose {
                strength: None,
                quantity_per_dose: 1.0,
                unit: "tablet".into(),
            },
            vec![ScheduleSlot::at(TimeOfDay::Morning)],
        );
        med.course_id = course_id;
        med
    }

    #[test]
    fn test_standalone_is_stock_based() {
        let (db, patient_id) = setup();
        let med = make_medicine(&patient_id, None);

        let resolved = resolve(&db, &med).unwrap();
        assert_eq!(resolved.model, ConsumptionModel::StockBased);
        assert_eq!(resolved.status, None);
        assert!(resolved.ensure_loggable().is_ok());
    }

    #[test]
    fn test_acute_course_is_quota_based() {
        let (db, patient_id) = setup();
        let course = TreatmentCourse::new(
            patient_id.clone(),
            "Typhoid".into(),
            CourseKind::Acute,
            Some(7),
            Utc::now(),
        );
        db.insert_course(&course).unwrap();
        let med = make_medicine(&patient_id, Some(course.course_id));

        let resolved = resolve(&db, &med).unwrap();
        assert_eq!(resolved.model, ConsumptionModel::QuotaBased);
        assert_eq!(resolved.status, Some(CourseStatus::Active));
    }

    #[test]
    fn test_chronic_course_is_stock_based() {
        let (db, patient_id) = setup();
        let course = TreatmentCourse::new(
            patient_id.clone(),
            "Hypertension".into(),
            CourseKind::Chronic,
            None,
            Utc::now(),
        );
        db.insert_course(&course).unwrap();
        let med = make_medicine(&patient_id, Some(course.course_id));

        let resolved = resolve(&db, &med).unwrap();
        assert_eq!(resolved.model, ConsumptionModel::StockBased);
    }

    #[test]
    fn test_paused_course_blocks_logging() {
        let (db, patient_id) = setup();
        let mut course = TreatmentCourse::new(
            patient_id.clone(),
            "Typhoid".into(),
            CourseKind::Acute,
            Some(7),
            Utc::now(),
        );
        course.status = CourseStatus::Paused;
        db.insert_course(&course).unwrap();
        let med = make_medicine(&patient_id, Some(course.course_id));

        let resolved = resolve(&db, &med).unwrap();
        let err = resolved.ensure_loggable().unwrap_err();
        assert!(matches!(
            err,
            EngineError::CourseNotActive {
                status: CourseStatus::Paused
            }
        ));
    }

    #[test]
    fn test_dangling_course_link_fails() {
        let (db, patient_id) = setup();
        let med = make_medicine(&patient_id, Some("gone".into()));

        let err = resolve(&db, &med).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_soft_deleted_course_link_fails() {
        let (db, patient_id) = setup();
        let course = TreatmentCourse::new(
            patient_id.clone(),
            "Typhoid".into(),
            CourseKind::Acute,
            Some(7),
            Utc::now(),
        );
        db.insert_course(&course).unwrap();
        db.soft_delete_course(&course.course_id).unwrap();
        let med = make_medicine(&patient_id, Some(course.course_id));

        let err = resolve(&db, &med).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
