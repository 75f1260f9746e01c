//! Medicine CRUD with course-aware inventory selection.
//!
//! Linking a medicine to an acute course switches it to quota tracking and
//! sizes the quota from `quantity_per_dose x slots_per_day x duration`; the
//! quota is kept in sync whenever the dose, slots, or course duration change.

use crate::db::Database;
use crate::engine::{verify_patient_ownership, EngineError, EngineResult};
use crate::models::{
    CourseKind, Dose, Inventory, Medicine, MedicineForm, ScheduleSlot, TreatmentCourse,
    DEFAULT_LOW_STOCK_THRESHOLD,
};

/// Input for creating a medicine.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub patient_id: String,
    pub course_id: Option<String>,
    pub name: String,
    pub form: MedicineForm,
    pub dose: Dose,
    pub schedule: Vec<ScheduleSlot>,
    /// Stock-tracked medicines only; ignored when linked to an acute course
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
}

/// Partial medicine update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub form: Option<MedicineForm>,
    pub dose: Option<Dose>,
    pub schedule: Option<Vec<ScheduleSlot>>,
    pub course_id: Option<String>,
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
}

pub struct MedicineService<'a> {
    db: &'a Database,
}

impl<'a> MedicineService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, caregiver_id: &str, input: NewMedicine) -> EngineResult<Medicine> {
        verify_patient_ownership(self.db, caregiver_id, &input.patient_id)?;
        if input.name.trim().is_empty() {
            return Err(EngineError::Validation("medicine name is required".into()));
        }

        let mut medicine = Medicine::new(
            input.patient_id,
            input.name,
            input.form,
            input.dose,
            input.schedule,
        );
        medicine.course_id = input.course_id;

        let course = self.linked_course(&medicine)?;
        medicine.inventory = match course {
            Some(ref course) if course.kind == CourseKind::Acute => Inventory::Quota {
                total_required: quota_for(&medicine, course),
                consumed: 0.0,
            },
            _ => Inventory::Stock {
                on_hand: input.stock.unwrap_or(0.0),
                low_stock_threshold: input
                    .low_stock_threshold
                    .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            },
        };

        medicine.validate().map_err(EngineError::Validation)?;
        self.db.insert_medicine(&medicine)?;
        Ok(medicine)
    }

    pub fn list(&self, caregiver_id: &str, patient_id: &str) -> EngineResult<Vec<Medicine>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;
        Ok(self.db.list_medicines_for_patient(patient_id)?)
    }

    /// Get an active medicine. Soft-deleted ones are not found.
    pub fn get(&self, caregiver_id: &str, medicine_id: &str) -> EngineResult<Medicine> {
        let medicine = self
            .db
            .get_medicine(medicine_id)?
            .filter(|m| m.is_active)
            .ok_or_else(|| EngineError::NotFound("Medicine".into()))?;
        verify_patient_ownership(self.db, caregiver_id, &medicine.patient_id)?;
        Ok(medicine)
    }

    pub fn update(
        &self,
        caregiver_id: &str,
        medicine_id: &str,
        update: MedicineUpdate,
    ) -> EngineResult<Medicine> {
        let mut medicine = self.get(caregiver_id, medicine_id)?;

        if let Some(name) = update.name {
            medicine.name = name;
        }
        if let Some(form) = update.form {
            medicine.form = form;
        }
        if let Some(dose) = update.dose {
            medicine.dose = dose;
        }
        if let Some(schedule) = update.schedule {
            medicine.schedule = schedule;
        }
        if let Some(course_id) = update.course_id {
            medicine.course_id = Some(course_id);
        }

        let course = self.linked_course(&medicine)?;
        medicine.inventory = match course {
            Some(ref course) if course.kind == CourseKind::Acute => {
                // Resize the quota to the edited dose/schedule, keeping what
                // has already been consumed.
                let consumed = match medicine.inventory {
                    Inventory::Quota { consumed, .. } => consumed,
                    Inventory::Stock { .. } => 0.0,
                };
                Inventory::Quota {
                    total_required: quota_for(&medicine, course),
                    consumed,
                }
            }
            _ => {
                let (on_hand, threshold) = match medicine.inventory {
                    Inventory::Stock {
                        on_hand,
                        low_stock_threshold,
                    } => (on_hand, low_stock_threshold),
                    Inventory::Quota { .. } => (0.0, DEFAULT_LOW_STOCK_THRESHOLD),
                };
                Inventory::Stock {
                    on_hand: update.stock.unwrap_or(on_hand),
                    low_stock_threshold: update.low_stock_threshold.unwrap_or(threshold),
                }
            }
        };

        medicine.validate().map_err(EngineError::Validation)?;
        self.db.update_medicine(&medicine)?;
        Ok(medicine)
    }

    /// Soft-delete a medicine.
    pub fn delete(&self, caregiver_id: &str, medicine_id: &str) -> EngineResult<()> {
        self.get(caregiver_id, medicine_id)?;
        self.db.soft_delete_medicine(medicine_id)?;
        Ok(())
    }

    /// Fetch and sanity-check the linked course: it must exist and belong to
    /// the medicine's patient.
    fn linked_course(&self, medicine: &Medicine) -> EngineResult<Option<TreatmentCourse>> {
        let Some(course_id) = medicine.course_id.as_deref() else {
            return Ok(None);
        };
        let course = self
            .db
            .get_course(course_id)?
            .ok_or_else(|| EngineError::NotFound("Linked treatment course".into()))?;
        if course.patient_id != medicine.patient_id {
            return Err(EngineError::Validation(
                "linked course belongs to a different patient".into(),
            ));
        }
        Ok(Some(course))
    }
}

fn quota_for(medicine: &Medicine, course: &TreatmentCourse) -> f64 {
    let duration = course.duration_in_days.unwrap_or(0);
    medicine.dose.quantity_per_dose * medicine.slots_per_day() as f64 * f64::from(duration)
}
