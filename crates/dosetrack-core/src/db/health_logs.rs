//! Health log database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{format_ts, parse_ts, Database, DbError, DbResult};
use crate::models::{HealthLog, VitalKind};

impl Database {
    /// Insert a health measurement.
    pub fn insert_health_log(&self, log: &HealthLog) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO health_logs (
                log_id, patient_id, vital, value, unit, notes, recorded_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                log.log_id,
                log.patient_id,
                log.vital.as_str(),
                log.value,
                log.unit,
                log.notes,
                format_ts(&log.recorded_at),
                log.created_at,
            ],
        )?;
        Ok(())
    }

    /// A patient's measurements, newest first, optionally filtered by vital
    /// and recording window (inclusive).
    pub fn list_health_logs(
        &self,
        patient_id: &str,
        vital: Option<VitalKind>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<HealthLog>> {
        let mut sql = String::from(
            "SELECT log_id, patient_id, vital, value, unit, notes, recorded_at, created_at
             FROM health_logs
             WHERE patient_id = ?1",
        );
        let mut bounds: Vec<String> = vec![patient_id.to_string()];
        if let Some(vital) = vital {
            bounds.push(vital.as_str().to_string());
            sql.push_str(&format!(" AND vital = ?{}", bounds.len()));
        }
        if let Some(start) = start {
            bounds.push(format_ts(&start));
            sql.push_str(&format!(" AND recorded_at >= ?{}", bounds.len()));
        }
        if let Some(end) = end {
            bounds.push(format_ts(&end));
            sql.push_str(&format!(" AND recorded_at <= ?{}", bounds.len()));
        }
        sql.push_str(" ORDER BY recorded_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bounds.iter()), health_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.try_into()?);
        }
        Ok(logs)
    }
}

/// Intermediate row struct for database mapping.
struct HealthLogRow {
    log_id: String,
    patient_id: String,
    vital: String,
    value: f64,
    unit: String,
    notes: Option<String>,
    recorded_at: String,
    created_at: String,
}

fn health_log_row(row: &Row<'_>) -> rusqlite::Result<HealthLogRow> {
    Ok(HealthLogRow {
        log_id: row.get(0)?,
        patient_id: row.get(1)?,
        vital: row.get(2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        notes: row.get(5)?,
        recorded_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl TryFrom<HealthLogRow> for HealthLog {
    type Error = DbError;

    fn try_from(row: HealthLogRow) -> Result<Self, Self::Error> {
        let vital = VitalKind::parse(&row.vital)
            .ok_or_else(|| DbError::Constraint(format!("Unknown vital: {}", row.vital)))?;

        Ok(HealthLog {
            log_id: row.log_id,
            patient_id: row.patient_id,
            vital,
            value: row.value,
            unit: row.unit,
            notes: row.notes,
            recorded_at: parse_ts(&row.recorded_at)?,
            created_at: row.created_at,
        })
    }
}
