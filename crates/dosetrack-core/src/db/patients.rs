//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Gender, MealTimings, Patient};

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let meal_timings = patient
            .meal_timings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO patients (
                patient_id, caregiver_id, name, age, gender, relation,
                avatar_url, theme_color, meal_timings, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                patient.patient_id,
                patient.caregiver_id,
                patient.name,
                i64::from(patient.age),
                patient.gender.as_str(),
                patient.relation,
                patient.avatar_url,
                patient.theme_color,
                meal_timings,
                patient.is_active,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let meal_timings = patient
            .meal_timings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                age = ?3,
                gender = ?4,
                relation = ?5,
                avatar_url = ?6,
                theme_color = ?7,
                meal_timings = ?8,
                updated_at = datetime('now')
            WHERE patient_id = ?1 AND is_active = 1
            "#,
            params![
                patient.patient_id,
                patient.name,
                i64::from(patient.age),
                patient.gender.as_str(),
                patient.relation,
                patient.avatar_url,
                patient.theme_color,
                meal_timings,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an active patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ? AND is_active = 1"
                ),
                [patient_id],
                patient_row,
            )
            .optional()?
            .map(Patient::try_from)
            .transpose()
    }

    /// List a caregiver's active patients, newest first.
    pub fn list_patients_by_caregiver(&self, caregiver_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE caregiver_id = ? AND is_active = 1
             ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([caregiver_id], patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Soft-delete a patient.
    pub fn soft_delete_patient(&self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET is_active = 0, updated_at = datetime('now')
             WHERE patient_id = ? AND is_active = 1",
            [patient_id],
        )?;
        Ok(rows_affected > 0)
    }
}

const PATIENT_COLUMNS: &str = "patient_id, caregiver_id, name, age, gender, relation, \
     avatar_url, theme_color, meal_timings, is_active, created_at, updated_at";

/// Intermediate row struct for database mapping.
struct PatientRow {
    patient_id: String,
    caregiver_id: String,
    name: String,
    age: i64,
    gender: String,
    relation: String,
    avatar_url: Option<String>,
    theme_color: Option<String>,
    meal_timings: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

fn patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        patient_id: row.get(0)?,
        caregiver_id: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        relation: row.get(5)?,
        avatar_url: row.get(6)?,
        theme_color: row.get(7)?,
        meal_timings: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = Gender::parse(&row.gender)
            .ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;
        let age = u32::try_from(row.age)
            .map_err(|_| DbError::Constraint(format!("Bad age: {}", row.age)))?;
        let meal_timings: Option<MealTimings> = row
            .meal_timings
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Patient {
            patient_id: row.patient_id,
            caregiver_id: row.caregiver_id,
            name: row.name,
            age,
            gender,
            relation: row.relation,
            avatar_url: row.avatar_url,
            theme_color: row.theme_color,
            meal_timings,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
