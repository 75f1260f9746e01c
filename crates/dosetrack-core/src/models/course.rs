//! Treatment course models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Kind of treatment course.
///
/// The kind decides the consumption model of linked medicines: acute courses
/// consume a fixed quota, chronic courses draw down on-hand stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    /// Time- and quantity-bounded treatment with a fixed duration
    Acute,
    /// Open-ended treatment
    Chronic,
}

impl CourseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseKind::Acute => "acute",
            CourseKind::Chronic => "chronic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "acute" => Some(CourseKind::Acute),
            "chronic" => Some(CourseKind::Chronic),
            _ => None,
        }
    }
}

/// Course lifecycle state. Dose logging is only permitted while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Active,
    Completed,
    Paused,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Active => "active",
            CourseStatus::Completed => "completed",
            CourseStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CourseStatus::Active),
            "completed" => Some(CourseStatus::Completed),
            "paused" => Some(CourseStatus::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A treatment course grouping the medicines prescribed for one condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentCourse {
    /// Unique course ID
    pub course_id: String,
    /// Owning patient
    pub patient_id: String,
    /// Condition name (e.g., "Typhoid", "Hypertension")
    pub name: String,
    pub kind: CourseKind,
    pub status: CourseStatus,
    /// Required for acute courses, absent for chronic ones
    pub duration_in_days: Option<u32>,
    pub start_date: DateTime<Utc>,
    /// Derived for acute courses: `start_date + duration_in_days`
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Soft-delete flag
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TreatmentCourse {
    /// Create a new active course. The end date is derived for acute courses.
    pub fn new(
        patient_id: String,
        name: String,
        kind: CourseKind,
        duration_in_days: Option<u32>,
        start_date: DateTime<Utc>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let mut course = Self {
            course_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            name,
            kind,
            status: CourseStatus::Active,
            duration_in_days,
            start_date,
            end_date: None,
            notes: None,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        course.derive_end_date();
        course
    }

    /// Re-derive `end_date` from `start_date + duration_in_days`.
    ///
    /// Must be called whenever the duration or start date changes. Chronic
    /// courses have no end date.
    pub fn derive_end_date(&mut self) {
        self.end_date = match (self.kind, self.duration_in_days) {
            (CourseKind::Acute, Some(days)) => {
                Some(self.start_date + Duration::days(i64::from(days)))
            }
            _ => None,
        };
    }

    /// Whether the course's time window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_date, Some(end) if now > end)
    }
}
