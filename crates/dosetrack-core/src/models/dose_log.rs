//! Dose log models and the calendar-day normalization rule.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Daily intake slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(TimeOfDay::Morning),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "evening" => Some(TimeOfDay::Evening),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one scheduled dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Taken,
    Skipped,
    Missed,
}

impl DoseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseStatus::Taken => "taken",
            DoseStatus::Skipped => "skipped",
            DoseStatus::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "taken" => Some(DoseStatus::Taken),
            "skipped" => Some(DoseStatus::Skipped),
            "missed" => Some(DoseStatus::Missed),
            _ => None,
        }
    }
}

/// One dose event. Immutable once written.
///
/// The triple (medicine_id, slot, scheduled_for) is unique in the ledger, so
/// at most one log exists per medicine per slot per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseLog {
    pub log_id: String,
    pub medicine_id: String,
    /// Denormalized from the medicine, never taken from caller input
    pub patient_id: String,
    pub status: DoseStatus,
    pub slot: TimeOfDay,
    /// The calendar day the dose was due, at UTC midnight
    pub scheduled_for: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl DoseLog {
    /// Create a log entry. `scheduled_for` is normalized to UTC midnight.
    pub fn new(
        medicine_id: String,
        patient_id: String,
        status: DoseStatus,
        slot: TimeOfDay,
        scheduled_for: DateTime<Utc>,
        taken_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            medicine_id,
            patient_id,
            status,
            slot,
            scheduled_for: normalize_scheduled_for(scheduled_for),
            taken_at,
            notes,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Truncate a timestamp to the start of its UTC calendar day.
///
/// Submissions differing only in time of day collide on the ledger's
/// uniqueness constraint once normalized.
pub fn normalize_scheduled_for(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}
