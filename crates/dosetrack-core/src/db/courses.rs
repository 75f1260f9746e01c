//! Treatment course database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_ts, parse_ts, Database, DbError, DbResult};
use crate::models::{CourseKind, CourseStatus, TreatmentCourse};

impl Database {
    /// Insert a new treatment course.
    pub fn insert_course(&self, course: &TreatmentCourse) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO treatment_courses (
                course_id, patient_id, name, kind, status, duration_in_days,
                start_date, end_date, notes, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                course.course_id,
                course.patient_id,
                course.name,
                course.kind.as_str(),
                course.status.as_str(),
                course.duration_in_days.map(i64::from),
                format_ts(&course.start_date),
                course.end_date.as_ref().map(format_ts),
                course.notes,
                course.is_active,
                course.created_at,
                course.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing course.
    pub fn update_course(&self, course: &TreatmentCourse) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE treatment_courses SET
                name = ?2,
                status = ?3,
                duration_in_days = ?4,
                start_date = ?5,
                end_date = ?6,
                notes = ?7,
                updated_at = datetime('now')
            WHERE course_id = ?1 AND is_active = 1
            "#,
            params![
                course.course_id,
                course.name,
                course.status.as_str(),
                course.duration_in_days.map(i64::from),
                format_ts(&course.start_date),
                course.end_date.as_ref().map(format_ts),
                course.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an active course by ID. Soft-deleted courses are not found.
    pub fn get_course(&self, course_id: &str) -> DbResult<Option<TreatmentCourse>> {
        self.conn
            .query_row(
                r#"
                SELECT course_id, patient_id, name, kind, status, duration_in_days,
                       start_date, end_date, notes, is_active, created_at, updated_at
                FROM treatment_courses
                WHERE course_id = ? AND is_active = 1
                "#,
                [course_id],
                course_row,
            )
            .optional()?
            .map(TreatmentCourse::try_from)
            .transpose()
    }

    /// List a patient's active courses, newest first.
    pub fn list_courses_for_patient(&self, patient_id: &str) -> DbResult<Vec<TreatmentCourse>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT course_id, patient_id, name, kind, status, duration_in_days,
                   start_date, end_date, notes, is_active, created_at, updated_at
            FROM treatment_courses
            WHERE patient_id = ? AND is_active = 1
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([patient_id], course_row)?;

        let mut courses = Vec::new();
        for row in rows {
            courses.push(row?.try_into()?);
        }
        Ok(courses)
    }

    /// Active acute courses whose time window elapsed before `now`.
    pub fn list_expired_acute_courses(
        &self,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<TreatmentCourse>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT course_id, patient_id, name, kind, status, duration_in_days,
                   start_date, end_date, notes, is_active, created_at, updated_at
            FROM treatment_courses
            WHERE kind = 'acute' AND status = 'active' AND is_active = 1
              AND end_date IS NOT NULL AND end_date < ?
            "#,
        )?;

        let rows = stmt.query_map([format_ts(&now)], course_row)?;

        let mut courses = Vec::new();
        for row in rows {
            courses.push(row?.try_into()?);
        }
        Ok(courses)
    }

    /// Set a course's lifecycle status.
    pub fn set_course_status(&self, course_id: &str, status: CourseStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE treatment_courses SET status = ?2, updated_at = datetime('now')
             WHERE course_id = ?1 AND is_active = 1",
            params![course_id, status.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Soft-delete a course. Medicine cascade is handled by the service layer.
    pub fn soft_delete_course(&self, course_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE treatment_courses SET is_active = 0, updated_at = datetime('now')
             WHERE course_id = ? AND is_active = 1",
            [course_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct CourseRow {
    course_id: String,
    patient_id: String,
    name: String,
    kind: String,
    status: String,
    duration_in_days: Option<i64>,
    start_date: String,
    end_date: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

fn course_row(row: &Row<'_>) -> rusqlite::Result<CourseRow> {
    Ok(CourseRow {
        course_id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        duration_in_days: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        notes: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl TryFrom<CourseRow> for TreatmentCourse {
    type Error = DbError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let kind = CourseKind::parse(&row.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown course kind: {}", row.kind)))?;
        let status = CourseStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown course status: {}", row.status)))?;
        let duration_in_days = row
            .duration_in_days
            .map(|d| {
                u32::try_from(d)
                    .map_err(|_| DbError::Constraint(format!("Bad course duration: {}", d)))
            })
            .transpose()?;

        Ok(TreatmentCourse {
            course_id: row.course_id,
            patient_id: row.patient_id,
            name: row.name,
            kind,
            status,
            duration_in_days,
            start_date: parse_ts(&row.start_date)?,
            end_date: row.end_date.as_deref().map(parse_ts).transpose()?,
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
