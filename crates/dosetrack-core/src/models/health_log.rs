//! Health vital measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracked vital sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    BloodSugar,
    BloodPressure,
    Weight,
    HeartRate,
    Spo2,
}

impl VitalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalKind::BloodSugar => "blood_sugar",
            VitalKind::BloodPressure => "blood_pressure",
            VitalKind::Weight => "weight",
            VitalKind::HeartRate => "heart_rate",
            VitalKind::Spo2 => "spo2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blood_sugar" => Some(VitalKind::BloodSugar),
            "blood_pressure" => Some(VitalKind::BloodPressure),
            "weight" => Some(VitalKind::Weight),
            "heart_rate" => Some(VitalKind::HeartRate),
            "spo2" => Some(VitalKind::Spo2),
            _ => None,
        }
    }
}

/// A timestamped scalar measurement for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthLog {
    pub log_id: String,
    pub patient_id: String,
    pub vital: VitalKind,
    pub value: f64,
    /// Measurement unit (e.g., "mg/dL", "bpm")
    pub unit: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: String,
}

impl HealthLog {
    pub fn new(
        patient_id: String,
        vital: VitalKind,
        value: f64,
        unit: String,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            vital,
            value,
            unit,
            notes: None,
            recorded_at,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
