//! Dose log ledger: append-only, uniqueness-enforcing writes plus range reads.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{format_ts, parse_ts, Database, DbError, DbResult};
use crate::models::{DoseLog, DoseStatus, TimeOfDay};

impl Database {
    /// Append a dose log. Fails with [`DbError::Duplicate`] when the
    /// (medicine, slot, scheduled day) triple already exists.
    pub fn insert_dose_log(&self, log: &DoseLog) -> DbResult<()> {
        insert_dose_log(&self.conn, log)
    }

    /// A patient's dose logs, newest first, optionally bounded by scheduled
    /// day (inclusive).
    pub fn list_dose_logs_by_patient(
        &self,
        patient_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<DoseLog>> {
        let mut sql = String::from(
            "SELECT log_id, medicine_id, patient_id, status, slot, scheduled_for,
                    taken_at, notes, created_at
             FROM dose_logs
             WHERE patient_id = ?1",
        );
        let mut bounds: Vec<String> = vec![patient_id.to_string()];
        if let Some(start) = start {
            bounds.push(format_ts(&start));
            sql.push_str(&format!(" AND scheduled_for >= ?{}", bounds.len()));
        }
        if let Some(end) = end {
            bounds.push(format_ts(&end));
            sql.push_str(&format!(" AND scheduled_for <= ?{}", bounds.len()));
        }
        sql.push_str(" ORDER BY scheduled_for DESC, slot ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bounds.iter()), dose_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.try_into()?);
        }
        Ok(logs)
    }

    /// Count logs for a medicine (used by tests and completion heuristics).
    pub fn count_dose_logs_for_medicine(&self, medicine_id: &str) -> DbResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM dose_logs WHERE medicine_id = ?",
            [medicine_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Ledger append over any connection (plain or transactional). The unique
/// index on (medicine_id, slot, scheduled_for) is the only duplicate check;
/// there is deliberately no pre-read.
pub(crate) fn insert_dose_log(conn: &Connection, log: &DoseLog) -> DbResult<()> {
    let result = conn.execute(
        r#"
        INSERT INTO dose_logs (
            log_id, medicine_id, patient_id, status, slot,
            scheduled_for, taken_at, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            log.log_id,
            log.medicine_id,
            log.patient_id,
            log.status.as_str(),
            log.slot.as_str(),
            format_ts(&log.scheduled_for),
            log.taken_at.as_ref().map(format_ts),
            log.notes,
            log.created_at,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(err) if super::is_unique_violation(&err) => Err(DbError::Duplicate(format!(
            "dose log for medicine {} slot {} on {}",
            log.medicine_id,
            log.slot,
            log.scheduled_for.date_naive()
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Intermediate row struct for database mapping.
struct DoseLogRow {
    log_id: String,
    medicine_id: String,
    patient_id: String,
    status: String,
    slot: String,
    scheduled_for: String,
    taken_at: Option<String>,
    notes: Option<String>,
    created_at: String,
}

fn dose_log_row(row: &Row<'_>) -> rusqlite::Result<DoseLogRow> {
    Ok(DoseLogRow {
        log_id: row.get(0)?,
        medicine_id: row.get(1)?,
        patient_id: row.get(2)?,
        status: row.get(3)?,
        slot: row.get(4)?,
        scheduled_for: row.get(5)?,
        taken_at: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl TryFrom<DoseLogRow> for DoseLog {
    type Error = DbError;

    fn try_from(row: DoseLogRow) -> Result<Self, Self::Error> {
        let status = DoseStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown dose status: {}", row.status)))?;
        let slot = TimeOfDay::parse(&row.slot)
            .ok_or_else(|| DbError::Constraint(format!("Unknown slot: {}", row.slot)))?;

        Ok(DoseLog {
            log_id: row.log_id,
            medicine_id: row.medicine_id,
            patient_id: row.patient_id,
            status,
            slot,
            scheduled_for: parse_ts(&row.scheduled_for)?,
            taken_at: row.taken_at.as_deref().map(parse_ts).transpose()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dose, Gender, Medicine, MedicineForm, Patient, ScheduleSlot};
    use chrono::TimeZone;

    fn setup_db() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(
            "caregiver-1".into(),
            "Grandpa".into(),
            80,
            Gender::Male,
            "Grandfather".into(),
        );
        db.insert_patient(&patient).unwrap();

        let medicine = Medicine::new(
            patient.patient_id.clone(),
            "Aspirin".into(),
            MedicineForm::Tablet,
            Dose {
                strength: None,
                quantity_per_dose: 1.0,
                unit: "tablet".into(),
            },
            vec![ScheduleSlot::at(TimeOfDay::Morning)],
        );
        db.insert_medicine(&medicine).unwrap();
        (db, patient.patient_id, medicine.medicine_id)
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, d, 0, 0, 0).unwrap()
    }

    fn make_log(
        medicine_id: &str,
        patient_id: &str,
        slot: TimeOfDay,
        scheduled_for: DateTime<Utc>,
    ) -> DoseLog {
        DoseLog::new(
            medicine_id.into(),
            patient_id.into(),
            DoseStatus::Taken,
            slot,
            scheduled_for,
            None,
            None,
        )
    }

    #[test]
    fn test_insert_and_list() {
        let (db, patient_id, medicine_id) = setup_db();

        db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(1)))
            .unwrap();
        db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(3)))
            .unwrap();
        db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(2)))
            .unwrap();

        let logs = db.list_dose_logs_by_patient(&patient_id, None, None).unwrap();
        assert_eq!(logs.len(), 3);
        // Newest first.
        assert_eq!(logs[0].scheduled_for, day(3));
        assert_eq!(logs[1].scheduled_for, day(2));
        assert_eq!(logs[2].scheduled_for, day(1));
    }

    #[test]
    fn test_duplicate_triple_is_typed() {
        let (db, patient_id, medicine_id) = setup_db();

        db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(1)))
            .unwrap();

        let err = db
            .insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(1)))
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));

        // A different slot on the same day is a different scheduled dose.
        db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Evening, day(1)))
            .unwrap();
    }

    #[test]
    fn test_range_filter() {
        let (db, patient_id, medicine_id) = setup_db();

        for d in 1..=5 {
            db.insert_dose_log(&make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(d)))
                .unwrap();
        }

        let logs = db
            .list_dose_logs_by_patient(&patient_id, Some(day(2)), Some(day(4)))
            .unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|l| l.scheduled_for >= day(2) && l.scheduled_for <= day(4)));

        let tail = db
            .list_dose_logs_by_patient(&patient_id, Some(day(4)), None)
            .unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn test_taken_at_round_trip() {
        let (db, patient_id, medicine_id) = setup_db();

        let taken_at = Utc.with_ymd_and_hms(2023, 10, 1, 8, 12, 0).unwrap();
        let mut log = make_log(&medicine_id, &patient_id, TimeOfDay::Morning, day(1));
        log.taken_at = Some(taken_at);
        log.notes = Some("after breakfast".into());
        db.insert_dose_log(&log).unwrap();

        let logs = db.list_dose_logs_by_patient(&patient_id, None, None).unwrap();
        assert_eq!(logs[0].taken_at, Some(taken_at));
        assert_eq!(logs[0].notes.as_deref(), Some("after breakfast"));
    }
}
