//! Dose logging orchestration.
//!
//! Each submission runs: ownership check → course-state guard → slot quantity
//! resolution → atomic counter adjustment + ledger append in one unit of work
//! → low-stock signal. The ledger's unique index is the sole arbiter of
//! "this scheduled dose was already processed"; the counter adjustment rides
//! in the same transaction, so a conflicting append rolls it back.

use chrono::{DateTime, Utc};

use crate::alerts::{LogAlertNotifier, LowStockNotifier};
use crate::db::{self, Database, DbError};
use crate::models::{
    normalize_scheduled_for, DoseLog, DoseStatus, Inventory, TimeOfDay,
};

use super::consumption::{self, ConsumptionModel};
use super::{verify_medicine_ownership, verify_patient_ownership, EngineError, EngineResult};

/// A dose-log submission.
#[derive(Debug, Clone)]
pub struct DoseRequest {
    pub medicine_id: String,
    pub status: DoseStatus,
    pub slot: TimeOfDay,
    /// Any instant within the scheduled day; normalized to UTC midnight
    pub scheduled_for: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Result of a successful dose log.
#[derive(Debug, Clone)]
pub struct DoseOutcome {
    pub log: DoseLog,
    /// The decrement left stock at or below the alert threshold
    pub low_stock: bool,
}

static LOG_NOTIFIER: LogAlertNotifier = LogAlertNotifier;

/// Orchestrates dose logging against the shared store.
pub struct DoseEngine<'a> {
    db: &'a mut Database,
    notifier: &'a dyn LowStockNotifier,
}

impl<'a> DoseEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            notifier: &LOG_NOTIFIER,
        }
    }

    /// Use a custom low-stock notifier (push delivery, test recorder).
    pub fn with_notifier(db: &'a mut Database, notifier: &'a dyn LowStockNotifier) -> Self {
        Self { db, notifier }
    }

    /// Log one dose event for the caller's patient.
    ///
    /// Only `taken` doses with a positive slot quantity touch the counters:
    /// quota-tracked medicines accumulate `consumed`, stock-tracked medicines
    /// pass a compare-and-set decrement that refuses to go negative. The
    /// ledger append and the counter adjustment commit or roll back together.
    pub fn log_dose(
        &mut self,
        caregiver_id: &str,
        request: &DoseRequest,
    ) -> EngineResult<DoseOutcome> {
        if request.medicine_id.trim().is_empty() {
            return Err(EngineError::Validation("medicine id is required".into()));
        }

        let (medicine, _patient) =
            verify_medicine_ownership(self.db, caregiver_id, &request.medicine_id)?;

        let resolved = consumption::resolve(self.db, &medicine)?;
        resolved.ensure_loggable()?;

        let amount = medicine.dose_for_slot(request.slot);
        let scheduled_for = normalize_scheduled_for(request.scheduled_for);
        let adjusts_counters = request.status == DoseStatus::Taken && amount > 0.0;

        // patient_id comes from the medicine, never from caller input.
        let log = DoseLog::new(
            medicine.medicine_id.clone(),
            medicine.patient_id.clone(),
            request.status,
            request.slot,
            scheduled_for,
            request.taken_at,
            request.notes.clone(),
        );

        let mut post_stock = None;
        let tx = self.db.transaction()?;

        if adjusts_counters {
            match resolved.model {
                ConsumptionModel::QuotaBased => {
                    if !db::increment_consumed(&tx, &medicine.medicine_id, amount)? {
                        return Err(EngineError::NotFound("Medicine".into()));
                    }
                }
                ConsumptionModel::StockBased => {
                    if !db::decrement_stock(&tx, &medicine.medicine_id, amount)? {
                        let have = db::stock_level(&tx, &medicine.medicine_id)?
                            .map(|(stock, _)| stock)
                            .unwrap_or(0.0);
                        return Err(EngineError::InsufficientStock {
                            needed: amount,
                            have,
                        });
                    }
                    post_stock = db::stock_level(&tx, &medicine.medicine_id)?;
                }
            }
        }

        match db::insert_dose_log(&tx, &log) {
            Ok(()) => {}
            Err(DbError::Duplicate(_)) => {
                // Dropping the transaction restores the counter adjustment.
                return Err(EngineError::DoseAlreadyLogged {
                    slot: request.slot,
                    date: scheduled_for.date_naive(),
                });
            }
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        tracing::info!(
            "dose {} for medicine {} slot {} on {}",
            request.status.as_str(),
            medicine.medicine_id,
            request.slot,
            scheduled_for.date_naive()
        );

        let low_stock =
            matches!(post_stock, Some((stock, threshold)) if stock <= threshold);
        if let (true, Some((stock, threshold))) = (low_stock, post_stock) {
            // Best-effort: alerting must never fail the dose log.
            let mut snapshot = medicine;
            snapshot.inventory = Inventory::Stock {
                on_hand: stock,
                low_stock_threshold: threshold,
            };
            self.notifier.notify(&snapshot);
        }

        Ok(DoseOutcome { log, low_stock })
    }

    /// A patient's dose history, newest first, ownership-checked.
    pub fn dose_logs(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<DoseLog>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;
        Ok(self.db.list_dose_logs_by_patient(patient_id, start, end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CourseKind, Dose, Gender, Medicine, MedicineForm, Patient, ScheduleSlot, TreatmentCourse,
    };
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

    fn stock_medicine(db: &Database, patient_id: &str, stock: f64, threshold: f64) -> Medicine {
        let mut med = Medicine::new(
            patient_id.into(),
            "Aspirin".into(),
            MedicineForm::Tablet,
            Dose {
                strength: None,
                quantity_per_dose: 1.0,
                unit: "tablet".into(),
            },
            vec![ScheduleSlot::at(TimeOfDay::Morning)],
        );
        med.inventory = Inventory::Stock {
            on_hand: stock,
            low_stock_threshold: threshold,
        };
        db.insert_medicine(&med).unwrap();
        med
    }

    fn quota_medicine(db: &Database, patient_id: &str, total: f64) -> Medicine {
        let course = TreatmentCourse::new(
            patient_id.into(),
            "Typhoid".into(),
            CourseKind::Acute,
            Some(7),
            Utc::now(),
        );
        db.insert_course(&course).unwrap();

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
        med.course_id = Some(course.course_id);
        med.inventory = Inventory::Quota {
            total_required: total,
            consumed: 0.0,
        };
        db.insert_medicine(&med).unwrap();
        med
    }

    fn request(medicine_id: &str, day: u32) -> DoseRequest {
        DoseRequest {
            medicine_id: medicine_id.into(),
            status: DoseStatus::Taken,
            slot: TimeOfDay::Morning,
            scheduled_for: Utc.with_ymd_and_hms(2023, 10, day, 8, 0, 0).unwrap(),
            taken_at: None,
            notes: None,
        }
    }

    #[test]
    fn test_taken_decrements_stock() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 10.0, 2.0);

        let outcome = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();
        assert!(!outcome.low_stock);
        assert_eq!(outcome.log.patient_id, patient_id);

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Stock {
                on_hand: 9.0,
                low_stock_threshold: 2.0
            }
        );
    }

    #[test]
    fn test_taken_increments_quota() {
        let (mut db, patient_id) = setup();
        let med = quota_medicine(&db, &patient_id, 7.0);

        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Quota {
                total_required: 7.0,
                consumed: 1.0
            }
        );
    }

    #[test]
    fn test_duplicate_rolls_back_counter() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 10.0, 0.0);

        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();

        // Same slot, same calendar day, different time of day.
        let mut retry = request(&med.medicine_id, 1);
        retry.scheduled_for = Utc.with_ymd_and_hms(2023, 10, 1, 21, 30, 0).unwrap();
        let err = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &retry)
            .unwrap_err();
        assert!(matches!(err, EngineError::DoseAlreadyLogged { .. }));

        // Exactly one decrement survived.
        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Stock {
                on_hand: 9.0,
                low_stock_threshold: 0.0
            }
        );
        assert_eq!(db.count_dose_logs_for_medicine(&med.medicine_id).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_rolls_back_quota() {
        let (mut db, patient_id) = setup();
        let med = quota_medicine(&db, &patient_id, 7.0);

        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();
        let err = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::DoseAlreadyLogged { .. }));

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Quota {
                total_required: 7.0,
                consumed: 1.0
            }
        );
    }

    #[test]
    fn test_skipped_and_missed_do_not_touch_counters() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 5.0, 0.0);

        for (day, status) in [(1, DoseStatus::Skipped), (2, DoseStatus::Missed)] {
            let mut req = request(&med.medicine_id, day);
            req.status = status;
            DoseEngine::new(&mut db).log_dose(CAREGIVER, &req).unwrap();
        }

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Stock {
                on_hand: 5.0,
                low_stock_threshold: 0.0
            }
        );
        assert_eq!(db.count_dose_logs_for_medicine(&med.medicine_id).unwrap(), 2);
    }

    #[test]
    fn test_insufficient_stock_writes_nothing() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 0.0, 0.0);

        let err = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { needed, have } if needed == 1.0 && have == 0.0
        ));
        assert_eq!(err.status_code(), 409);
        assert_eq!(db.count_dose_logs_for_medicine(&med.medicine_id).unwrap(), 0);
    }

    #[test]
    fn test_low_stock_flag_at_threshold() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 2.0, 2.0);

        let outcome = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();
        // 2 -> 1, and 1 <= 2.
        assert!(outcome.low_stock);
    }

    #[test]
    fn test_zero_threshold_not_low_until_empty() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 2.0, 0.0);

        let outcome = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();
        assert!(!outcome.low_stock);

        let outcome = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 2))
            .unwrap();
        // 1 -> 0, and 0 <= 0.
        assert!(outcome.low_stock);
    }

    #[test]
    fn test_paused_course_blocks_regardless_of_quota() {
        let (mut db, patient_id) = setup();
        let med = quota_medicine(&db, &patient_id, 7.0);
        let course_id = med.course_id.clone().unwrap();
        db.set_course_status(&course_id, crate::models::CourseStatus::Paused)
            .unwrap();

        let err = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot log dose. Treatment course is paused");
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_slot_quantity_override_drives_amount() {
        let (mut db, patient_id) = setup();
        let mut med = stock_medicine(&db, &patient_id, 10.0, 0.0);
        med.schedule = vec![ScheduleSlot {
            time_of_day: TimeOfDay::Morning,
            meal_relation: None,
            quantity: Some(3.0),
            reminder_time: None,
        }];
        db.update_medicine(&med).unwrap();

        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Stock {
                on_hand: 7.0,
                low_stock_threshold: 0.0
            }
        );
    }

    #[test]
    fn test_zero_quantity_slot_skips_counters() {
        let (mut db, patient_id) = setup();
        let mut med = stock_medicine(&db, &patient_id, 5.0, 0.0);
        med.schedule = vec![ScheduleSlot {
            time_of_day: TimeOfDay::Morning,
            meal_relation: None,
            quantity: Some(0.0),
            reminder_time: None,
        }];
        db.update_medicine(&med).unwrap();

        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();

        let after = db.get_medicine(&med.medicine_id).unwrap().unwrap();
        assert_eq!(
            after.inventory,
            Inventory::Stock {
                on_hand: 5.0,
                low_stock_threshold: 0.0
            }
        );
        // The log itself is still written.
        assert_eq!(db.count_dose_logs_for_medicine(&med.medicine_id).unwrap(), 1);
    }

    #[test]
    fn test_foreign_caregiver_is_forbidden() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 5.0, 0.0);

        let err = DoseEngine::new(&mut db)
            .log_dose("caregiver-2", &request(&med.medicine_id, 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn test_empty_medicine_id_is_validation_error() {
        let (mut db, _) = setup();
        let err = DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request("  ", 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_dose_logs_are_ownership_checked() {
        let (mut db, patient_id) = setup();
        let med = stock_medicine(&db, &patient_id, 5.0, 0.0);
        DoseEngine::new(&mut db)
            .log_dose(CAREGIVER, &request(&med.medicine_id, 1))
            .unwrap();

        let engine = DoseEngine::new(&mut db);
        let logs = engine.dose_logs(CAREGIVER, &patient_id, None, None).unwrap();
        assert_eq!(logs.len(), 1);

        let err = engine
            .dose_logs("caregiver-2", &patient_id, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }
}
