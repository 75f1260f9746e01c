//! Read-side aggregation over the dose ledger and health logs.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::engine::{verify_patient_ownership, EngineError, EngineResult};
use crate::models::{DoseStatus, TimeOfDay, VitalKind};

/// Adherence counts over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceReport {
    pub total: i64,
    pub taken: i64,
    pub skipped: i64,
    pub missed: i64,
    /// `taken / total x 100`, 0 when there are no logs
    pub adherence_percentage: f64,
}

impl AdherenceReport {
    fn empty() -> Self {
        Self {
            total: 0,
            taken: 0,
            skipped: 0,
            missed: 0,
            adherence_percentage: 0.0,
        }
    }
}

/// One row of the detailed dose history used by report rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseLogDetail {
    pub date: DateTime<Utc>,
    pub slot: TimeOfDay,
    pub medicine_name: String,
    pub status: DoseStatus,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Per-vital aggregate over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSummary {
    pub vital: VitalKind,
    pub count: i64,
    pub min: f64,
    pub max: f64,
    /// Rounded to two decimals
    pub avg: f64,
}

/// Aggregates ledger and vitals data for reports.
pub struct ReportAggregator<'a> {
    db: &'a Database,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Adherence counts for a patient over `[start, end]`, optionally
    /// restricted to the medicines of one treatment course.
    pub fn adherence(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        course_id: Option<&str>,
    ) -> EngineResult<AdherenceReport> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;

        let mut sql = String::from(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'taken' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'skipped' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'missed' THEN 1 ELSE 0 END), 0)
             FROM dose_logs
             WHERE patient_id = ?1 AND scheduled_for >= ?2 AND scheduled_for <= ?3",
        );
        let mut bounds = vec![
            patient_id.to_string(),
            crate::db::format_ts(&start),
            crate::db::format_ts(&end),
        ];
        match self.course_medicine_ids(patient_id, course_id)? {
            Some(ids) if ids.is_empty() => return Ok(AdherenceReport::empty()),
            Some(ids) => append_in_clause(&mut sql, &mut bounds, "medicine_id", ids),
            None => {}
        }

        let (total, taken, skipped, missed) = self.db.conn().query_row(
            &sql,
            rusqlite::params_from_iter(bounds.iter()),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;

        let adherence_percentage = if total == 0 {
            0.0
        } else {
            taken as f64 / total as f64 * 100.0
        };
        Ok(AdherenceReport {
            total,
            taken,
            skipped,
            missed,
            adherence_percentage,
        })
    }

    /// Detailed dose rows for report rendering, newest first, with medicine
    /// names resolved by a join.
    pub fn dose_log_details(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        course_id: Option<&str>,
    ) -> EngineResult<Vec<DoseLogDetail>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;

        let mut sql = String::from(
            "SELECT l.scheduled_for, l.slot, COALESCE(m.name, 'Unknown'), l.status, l.taken_at
             FROM dose_logs l
             LEFT JOIN medicines m ON m.medicine_id = l.medicine_id
             WHERE l.patient_id = ?1 AND l.scheduled_for >= ?2 AND l.scheduled_for <= ?3",
        );
        let mut bounds = vec![
            patient_id.to_string(),
            crate::db::format_ts(&start),
            crate::db::format_ts(&end),
        ];
        match self.course_medicine_ids(patient_id, course_id)? {
            Some(ids) if ids.is_empty() => return Ok(Vec::new()),
            Some(ids) => append_in_clause(&mut sql, &mut bounds, "l.medicine_id", ids),
            None => {}
        }
        sql.push_str(" ORDER BY l.scheduled_for DESC, l.slot ASC");

        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bounds.iter()), detail_row)?;

        let mut details = Vec::new();
        for row in rows {
            details.push(row??);
        }
        Ok(details)
    }

    /// Per-vital count/min/max/avg for a patient over `[start, end]`.
    pub fn health_summary(
        &self,
        caregiver_id: &str,
        patient_id: &str,
        vital: Option<VitalKind>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<VitalSummary>> {
        verify_patient_ownership(self.db, caregiver_id, patient_id)?;

        let mut sql = String::from(
            "SELECT vital, COUNT(*), MIN(value), MAX(value), ROUND(AVG(value), 2)
             FROM health_logs
             WHERE patient_id = ?1 AND recorded_at >= ?2 AND recorded_at <= ?3",
        );
        let mut bounds = vec![
            patient_id.to_string(),
            crate::db::format_ts(&start),
            crate::db::format_ts(&end),
        ];
        if let Some(vital) = vital {
            bounds.push(vital.as_str().to_string());
            sql.push_str(&format!(" AND vital = ?{}", bounds.len()));
        }
        sql.push_str(" GROUP BY vital ORDER BY vital");

        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bounds.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (vital, count, min, max, avg) = row?;
            let vital = VitalKind::parse(&vital).ok_or_else(|| {
                EngineError::Db(crate::db::DbError::Constraint(format!(
                    "Unknown vital: {}",
                    vital
                )))
            })?;
            summaries.push(VitalSummary {
                vital,
                count,
                min,
                max,
                avg,
            });
        }
        Ok(summaries)
    }

    /// Medicine IDs of one course, for the optional report filter. `None`
    /// means no filter; an empty set means the course has no medicines.
    fn course_medicine_ids(
        &self,
        patient_id: &str,
        course_id: Option<&str>,
    ) -> EngineResult<Option<Vec<String>>> {
        let Some(course_id) = course_id else {
            return Ok(None);
        };
        let mut stmt = self.db.conn().prepare(
            "SELECT medicine_id FROM medicines WHERE patient_id = ?1 AND course_id = ?2",
        )?;
        let ids = stmt
            .query_map([patient_id, course_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(crate::db::DbError::from)?;
        Ok(Some(ids))
    }
}

fn append_in_clause(sql: &mut String, bounds: &mut Vec<String>, column: &str, ids: Vec<String>) {
    let placeholders: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", bounds.len() + i + 1))
        .collect();
    sql.push_str(&format!(" AND {} IN ({})", column, placeholders.join(", ")));
    bounds.extend(ids);
}

type DetailRow = Result<DoseLogDetail, EngineError>;

fn detail_row(row: &Row<'_>) -> rusqlite::Result<DetailRow> {
    let scheduled_for: String = row.get(0)?;
    let slot: String = row.get(1)?;
    let medicine_name: String = row.get(2)?;
    let status: String = row.get(3)?;
    let taken_at: Option<String> = row.get(4)?;

    Ok((|| {
        let constraint = |msg: String| EngineError::Db(crate::db::DbError::Constraint(msg));
        Ok(DoseLogDetail {
            date: crate::db::parse_ts(&scheduled_for)?,
            slot: TimeOfDay::parse(&slot)
                .ok_or_else(|| constraint(format!("Unknown slot: {}", slot)))?,
            medicine_name,
            status: DoseStatus::parse(&status)
                .ok_or_else(|| constraint(format!("Unknown dose status: {}", status)))?,
            taken_at: taken_at.as_deref().map(crate::db::parse_ts).transpose()?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Dose, DoseLog, Gender, HealthLog, Medicine, MedicineForm, Patient, ScheduleSlot,
    };
    use chrono::TimeZone;

    const CAREGIVER: &str = "caregiver-1";

    fn setup() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new(
            CAREGIVER.into(),
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

    fn log(db: &Database, medicine_id: &str, patient_id: &str, status: DoseStatus, d: u32) {
        db.insert_dose_log(&DoseLog::new(
            medicine_id.into(),
            patient_id.into(),
            status,
            TimeOfDay::Morning,
            day(d),
            None,
            None,
        ))
        .unwrap();
    }

    #[test]
    fn test_adherence_counts_and_percentage() {
        let (db, patient_id, medicine_id) = setup();

        log(&db, &medicine_id, &patient_id, DoseStatus::Taken, 1);
        log(&db, &medicine_id, &patient_id, DoseStatus::Taken, 2);
        log(&db, &medicine_id, &patient_id, DoseStatus::Skipped, 3);
        log(&db, &medicine_id, &patient_id, DoseStatus::Missed, 4);

        let report = ReportAggregator::new(&db)
            .adherence(CAREGIVER, &patient_id, day(1), day(31), None)
            .unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.taken, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.missed, 1);
        assert!((report.adherence_percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_adherence_empty_range_is_zero() {
        let (db, patient_id, _) = setup();

        let report = ReportAggregator::new(&db)
            .adherence(CAREGIVER, &patient_id, day(1), day(31), None)
            .unwrap();
        assert_eq!(report, AdherenceReport::empty());
    }

    #[test]
    fn test_adherence_range_bounds() {
        let (db, patient_id, medicine_id) = setup();

        for d in 1..=10 {
            log(&db, &medicine_id, &patient_id, DoseStatus::Taken, d);
        }

        let report = ReportAggregator::new(&db)
            .adherence(CAREGIVER, &patient_id, day(3), day(5), None)
            .unwrap();
        assert_eq!(report.total, 3);
    }

    #[test]
    fn test_course_filter_restricts_to_linked_medicines() {
        let (db, patient_id, medicine_id) = setup();

        // A second medicine linked to a course.
        let course = crate::models::TreatmentCourse::new(
            patient_id.clone(),
            "Typhoid".into(),
            crate::models::CourseKind::Acute,
            Some(7),
            day(1),
        );
        db.insert_course(&course).unwrap();
        let mut linked = Medicine::new(
            patient_id.clone(),
            "Amoxicillin".into(),
            MedicineForm::Tablet,
            Dose {
                strength: None,
                quantity_per_dose: 1.0,
                unit: "tablet".into(),
            },
            vec![ScheduleSlot::at(TimeOfDay::Morning)],
        );
        linked.course_id = Some(course.course_id.clone());
        db.insert_medicine(&linked).unwrap();

        log(&db, &medicine_id, &patient_id, DoseStatus::Taken, 1);
        log(&db, &linked.medicine_id, &patient_id, DoseStatus::Missed, 1);

        let report = ReportAggregator::new(&db)
            .adherence(
                CAREGIVER,
                &patient_id,
                day(1),
                day(31),
                Some(&course.course_id),
            )
            .unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.missed, 1);

        // A course with no medicines reports zeros.
        let empty_course = crate::models::TreatmentCourse::new(
            patient_id.clone(),
            "Flu".into(),
            crate::models::CourseKind::Acute,
            Some(3),
            day(1),
        );
        db.insert_course(&empty_course).unwrap();
        let report = ReportAggregator::new(&db)
            .adherence(
                CAREGIVER,
                &patient_id,
                day(1),
                day(31),
                Some(&empty_course.course_id),
            )
            .unwrap();
        assert_eq!(report, AdherenceReport::empty());
    }

    #[test]
    fn test_dose_log_details_resolve_names() {
        let (db, patient_id, medicine_id) = setup();

        log(&db, &medicine_id, &patient_id, DoseStatus::Taken, 2);
        log(&db, &medicine_id, &patient_id, DoseStatus::Skipped, 1);

        let details = ReportAggregator::new(&db)
            .dose_log_details(CAREGIVER, &patient_id, day(1), day(31), None)
            .unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].medicine_name, "Aspirin");
        assert_eq!(details[0].date, day(2)); // newest first
        assert_eq!(details[1].status, DoseStatus::Skipped);
    }

    #[test]
    fn test_health_summary_math() {
        let (db, patient_id, _) = setup();

        for (d, value) in [(1, 100.0), (2, 120.0), (3, 110.0)] {
            db.insert_health_log(&HealthLog::new(
                patient_id.clone(),
                VitalKind::BloodSugar,
                value,
                "mg/dL".into(),
                day(d),
            ))
            .unwrap();
        }
        db.insert_health_log(&HealthLog::new(
            patient_id.clone(),
            VitalKind::HeartRate,
            72.0,
            "bpm".into(),
            day(1),
        ))
        .unwrap();

        let summaries = ReportAggregator::new(&db)
            .health_summary(CAREGIVER, &patient_id, None, day(1), day(31))
            .unwrap();
        assert_eq!(summaries.len(), 2);

        let sugar = summaries
            .iter()
            .find(|s| s.vital == VitalKind::BloodSugar)
            .unwrap();
        assert_eq!(sugar.count, 3);
        assert_eq!(sugar.min, 100.0);
        assert_eq!(sugar.max, 120.0);
        assert_eq!(sugar.avg, 110.0);

        let only_hr = ReportAggregator::new(&db)
            .health_summary(
                CAREGIVER,
                &patient_id,
                Some(VitalKind::HeartRate),
                day(1),
                day(31),
            )
            .unwrap();
        assert_eq!(only_hr.len(), 1);
        assert_eq!(only_hr[0].count, 1);
    }

    #[test]
    fn test_reports_are_ownership_checked() {
        let (db, patient_id, _) = setup();

        let err = ReportAggregator::new(&db)
            .adherence("caregiver-2", &patient_id, day(1), day(31), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }
}
