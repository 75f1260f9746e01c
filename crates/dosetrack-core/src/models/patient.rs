//! Patient models.

use serde::{Deserialize, Serialize};

/// Patient gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Default meal times used by the mobile client to anchor slot reminders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealTimings {
    /// HH:MM
    pub breakfast: String,
    /// HH:MM
    pub lunch: String,
    /// HH:MM
    pub dinner: String,
}

/// A patient cared for by one caregiver account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Unique patient ID
    pub patient_id: String,
    /// Owning caregiver account
    pub caregiver_id: String,
    /// Patient name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Gender
    pub gender: Gender,
    /// Relation to the caregiver (e.g., "Father", "Self")
    pub relation: String,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Theme color for the patient card
    pub theme_color: Option<String>,
    /// Per-patient scheduling defaults
    pub meal_timings: Option<MealTimings>,
    /// Soft-delete flag
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(
        caregiver_id: String,
        name: String,
        age: u32,
        gender: Gender,
        relation: String,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            caregiver_id,
            name,
            age,
            gender,
            relation,
            avatar_url: None,
            theme_color: None,
            meal_timings: None,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Check whether the given caregiver owns this patient.
    pub fn is_owned_by(&self, caregiver_id: &str) -> bool {
        self.caregiver_id == caregiver_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new(
            "caregiver-1".into(),
            "Grandpa".into(),
            80,
            Gender::Male,
            "Grandfather".into(),
        );
        assert_eq!(patient.name, "Grandpa");
        assert!(patient.is_active);
        assert!(patient.is_owned_by("caregiver-1"));
        assert!(!patient.is_owned_by("caregiver-2"));
        assert_eq!(patient.patient_id.len(), 36); // UUID format
    }

    #[test]
    fn test_gender_round_trip() {
        for g in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(Gender::parse(g.as_str()), Some(g));
        }
        assert_eq!(Gender::parse("unknown"), None);
    }
}
