//! Patient CRUD.

use crate::db::Database;
use crate::engine::{verify_patient_ownership, EngineError, EngineResult};
use crate::models::{is_valid_hhmm, Gender, MealTimings, Patient};

/// Input for creating a patient.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub relation: String,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub meal_timings: Option<MealTimings>,
}

/// Partial patient update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub relation: Option<String>,
    pub avatar_url: Option<String>,
    pub theme_color: Option<String>,
    pub meal_timings: Option<MealTimings>,
}

pub struct PatientService<'a> {
    db: &'a Database,
}

impl<'a> PatientService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, caregiver_id: &str, input: NewPatient) -> EngineResult<Patient> {
        if input.name.trim().is_empty() {
            return Err(EngineError::Validation("patient name is required".into()));
        }
        if input.relation.trim().is_empty() {
            return Err(EngineError::Validation("relation is required".into()));
        }
        if input.age == 0 {
            return Err(EngineError::Validation("age must be positive".into()));
        }
        validate_meal_timings(input.meal_timings.as_ref())?;

        let mut patient = Patient::new(
            caregiver_id.to_string(),
            input.name,
            input.age,
            input.gender,
            input.relation,
        );
        patient.avatar_url = input.avatar_url;
        patient.theme_color = input.theme_color;
        patient.meal_timings = input.meal_timings;

        self.db.insert_patient(&patient)?;
        Ok(patient)
    }

    pub fn list(&self, caregiver_id: &str) -> EngineResult<Vec<Patient>> {
        Ok(self.db.list_patients_by_caregiver(caregiver_id)?)
    }

    pub fn get(&self, caregiver_id: &str, patient_id: &str) -> EngineResult<Patient> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)
    }

    pub fn update(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        update: PatientUpdate,
    ) -> EngineResult<Patient> {
        let mut patient = verify_patient_ownership(self.db, caregiver_id, patient_id)?;

        if let Some(name) = update.name {
            patient.name = name;
        }
        if let Some(age) = update.age {
            patient.age = age;
        }
        if let Some(gender) = update.gender {
            patient.gender = gender;
        }
        if let Some(relation) = update.relation {
            patient.relation = relation;
        }
        if let Some(avatar_url) = update.avatar_url {
            patient.avatar_url = Some(avatar_url);
        }
        if let Some(theme_color) = update.theme_color {
            patient.theme_color = Some(theme_color);
        }
        if let Some(meal_timings) = update.meal_timings {
            patient.meal_timings = Some(meal_timings);
        }
        validate_meal_timings(patient.meal_timings.as_ref())?;

        self.db.update_patient(&patient)?;
        Ok(patient)
    }

    /// Soft-delete a patient. Historical logs stay readable; all further
    /// operations on the patient's records fail the ownership check.
    pub fn delete(&self, caregiver_id: &str, patient_id: &str) -> EngineResult<()> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;
        self.db.soft_delete_patient(patient_id)?;
        Ok(())
    }
}

fn validate_meal_timings(timings: Option<&MealTimings>) -> EngineResult<()> {
    if let Some(t) = timings {
        for (label, value) in [
            ("breakfast", &t.breakfast),
            ("lunch", &t.lunch),
            ("dinner", &t.dinner),
        ] {
            if !is_valid_hhmm(value) {
                return Err(EngineError::Validation(format!(
                    "invalid {} time '{}', expected HH:MM",
                    label, value
                )));
            }
        }
    }
    Ok(())
}
