//! Medicine models: dosage, intake schedule, and consumption counters.

use serde::{Deserialize, Serialize};

use super::TimeOfDay;

/// Stock level below which the low-stock alert fires, unless configured.
pub const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 5.0;

/// Pharmaceutical form of a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineForm {
    Tablet,
    Syrup,
    Injection,
    Drops,
    Cream,
    Inhaler,
}

impl MedicineForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicineForm::Tablet => "tablet",
            MedicineForm::Syrup => "syrup",
            MedicineForm::Injection => "injection",
            MedicineForm::Drops => "drops",
            MedicineForm::Cream => "cream",
            MedicineForm::Inhaler => "inhaler",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tablet" => Some(MedicineForm::Tablet),
            "syrup" => Some(MedicineForm::Syrup),
            "injection" => Some(MedicineForm::Injection),
            "drops" => Some(MedicineForm::Drops),
            "cream" => Some(MedicineForm::Cream),
            "inhaler" => Some(MedicineForm::Inhaler),
            _ => None,
        }
    }

    /// Dose units accepted for this form. Empty slice = unrestricted.
    pub fn allowed_units(&self) -> &'static [&'static str] {
        match self {
            MedicineForm::Tablet => &["tablet", "capsule"],
            MedicineForm::Syrup => &["ml"],
            MedicineForm::Injection => &["ml", "iu"],
            MedicineForm::Drops => &["drops"],
            MedicineForm::Inhaler => &["puff"],
            MedicineForm::Cream => &[],
        }
    }
}

/// Timing of an intake slot relative to a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealRelation {
    BeforeBreakfast,
    AfterBreakfast,
    BeforeLunch,
    AfterLunch,
    BeforeDinner,
    AfterDinner,
}

impl MealRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealRelation::BeforeBreakfast => "before_breakfast",
            MealRelation::AfterBreakfast => "after_breakfast",
            MealRelation::BeforeLunch => "before_lunch",
            MealRelation::AfterLunch => "after_lunch",
            MealRelation::BeforeDinner => "before_dinner",
            MealRelation::AfterDinner => "after_dinner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "before_breakfast" => Some(MealRelation::BeforeBreakfast),
            "after_breakfast" => Some(MealRelation::AfterBreakfast),
            "before_lunch" => Some(MealRelation::BeforeLunch),
            "after_lunch" => Some(MealRelation::AfterLunch),
            "before_dinner" => Some(MealRelation::BeforeDinner),
            "after_dinner" => Some(MealRelation::AfterDinner),
            _ => None,
        }
    }
}

/// The default per-slot dose amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dose {
    /// Label such as "500mg" (display only)
    pub strength: Option<String>,
    /// Units consumed per intake unless a slot overrides it
    pub quantity_per_dose: f64,
    /// Unit of `quantity_per_dose` (e.g., "tablet", "ml")
    pub unit: String,
}

/// One scheduled intake opportunity per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub time_of_day: TimeOfDay,
    pub meal_relation: Option<MealRelation>,
    /// Per-slot override of `Dose::quantity_per_dose`
    pub quantity: Option<f64>,
    /// HH:MM reminder override
    pub reminder_time: Option<String>,
}

impl ScheduleSlot {
    pub fn at(time_of_day: TimeOfDay) -> Self {
        Self {
            time_of_day,
            meal_relation: None,
            quantity: None,
            reminder_time: None,
        }
    }
}

/// Consumption counters, selected by the linked course's kind.
///
/// The two variants are mutually exclusive: a medicine either draws down
/// on-hand stock (standalone or chronic course) or consumes a fixed quota
/// sized to an acute course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "model")]
pub enum Inventory {
    Stock {
        /// Units currently on hand
        on_hand: f64,
        /// Alert threshold (`on_hand <= threshold` after a decrement fires it)
        low_stock_threshold: f64,
    },
    Quota {
        /// `quantity_per_dose x slots_per_day x duration_in_days`
        total_required: f64,
        /// Units consumed so far
        consumed: f64,
    },
}

impl Inventory {
    pub fn is_quota(&self) -> bool {
        matches!(self, Inventory::Quota { .. })
    }

    /// Quota fully consumed. Always false for the stock variant.
    pub fn is_exhausted(&self) -> bool {
        match self {
            Inventory::Quota {
                total_required,
                consumed,
            } => *consumed >= *total_required,
            Inventory::Stock { .. } => false,
        }
    }
}

/// A medicine with its dosage, intake schedule, and consumption counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    /// Unique medicine ID
    pub medicine_id: String,
    /// Owning patient
    pub patient_id: String,
    /// Linked treatment course, if any
    pub course_id: Option<String>,
    pub name: String,
    pub form: MedicineForm,
    pub dose: Dose,
    /// Intake slots, unique per time of day
    pub schedule: Vec<ScheduleSlot>,
    pub inventory: Inventory,
    /// Soft-delete flag
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Medicine {
    /// Create a standalone stock-tracked medicine.
    pub fn new(
        patient_id: String,
        name: String,
        form: MedicineForm,
        dose: Dose,
        schedule: Vec<ScheduleSlot>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            medicine_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            course_id: None,
            name,
            form,
            dose,
            schedule,
            inventory: Inventory::Stock {
                on_hand: 0.0,
                low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            },
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn slots_per_day(&self) -> usize {
        self.schedule.len()
    }

    /// Quantity consumed by one dose in the given slot: the slot override if
    /// configured, else the medicine default. Unconfigured slots fall back to
    /// the default as well.
    pub fn dose_for_slot(&self, slot: TimeOfDay) -> f64 {
        self.schedule
            .iter()
            .find(|s| s.time_of_day == slot)
            .and_then(|s| s.quantity)
            .unwrap_or(self.dose.quantity_per_dose)
    }

    /// Validate dosage and schedule shape.
    pub fn validate(&self) -> Result<(), String> {
        if self.dose.quantity_per_dose <= 0.0 {
            return Err("quantity per dose must be positive".into());
        }
        if self.dose.unit.trim().is_empty() {
            return Err("dose unit is required".into());
        }
        let allowed = self.form.allowed_units();
        if !allowed.is_empty() && !allowed.contains(&self.dose.unit.to_lowercase().as_str()) {
            return Err(format!(
                "unit '{}' is invalid for form '{}', expected one of: {}",
                self.dose.unit,
                self.form.as_str(),
                allowed.join(", ")
            ));
        }
        if self.schedule.is_empty() {
            return Err("at least one intake slot is required".into());
        }
        let mut seen = Vec::new();
        for slot in &self.schedule {
            if seen.contains(&slot.time_of_day) {
                return Err(format!(
                    "duplicate intake slot '{}'",
                    slot.time_of_day.as_str()
                ));
            }
            seen.push(slot.time_of_day);
            if let Some(q) = slot.quantity {
                if q < 0.0 {
                    return Err("slot quantity cannot be negative".into());
                }
            }
            if let Some(ref t) = slot.reminder_time {
                if !is_valid_hhmm(t) {
                    return Err(format!("invalid reminder time '{}', expected HH:MM", t));
                }
            }
        }
        Ok(())
    }
}

/// Check an HH:MM 24-hour time string.
pub fn is_valid_hhmm(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (h, m) = (s[0..2].parse::<u8>(), s[3..5].parse::<u8>());
    matches!((h, m), (Ok(h), Ok(m)) if h < 24 && m < 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tablet_medicine() -> Medicine {
        Medicine::new(
            "patient-1".into(),
            "Aspirin".into(),
            MedicineForm::Tablet,
            Dose {
                strength: Some("100mg".into()),
                quantity_per_dose: 1.0,
                unit: "tablet".into(),
            },
            vec![
                ScheduleSlot::at(TimeOfDay::Morning),
                ScheduleSlot {
                    time_of_day: TimeOfDay::Evening,
                    meal_relation: Some(MealRelation::AfterDinner),
                    quantity: Some(2.0),
                    reminder_time: Some("20:30".into()),
                },
            ],
        )
    }

    #[test]
    fn test_dose_for_slot_override() {
        let med = tablet_medicine();
        assert_eq!(med.dose_for_slot(TimeOfDay::Morning), 1.0);
        assert_eq!(med.dose_for_slot(TimeOfDay::Evening), 2.0);
        // Unconfigured slot falls back to the default.
        assert_eq!(med.dose_for_slot(TimeOfDay::Afternoon), 1.0);
    }

    #[test]
    fn test_validate_ok() {
        assert!(tablet_medicine().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_slots() {
        let mut med = tablet_medicine();
        med.schedule.push(ScheduleSlot::at(TimeOfDay::Morning));
        let err = med.validate().unwrap_err();
        assert!(err.contains("duplicate intake slot"));
    }

    #[test]
    fn test_validate_rejects_bad_unit_for_form() {
        let mut med = tablet_medicine();
        med.dose.unit = "ml".into();
        assert!(med.validate().is_err());

        // Cream accepts any unit.
        med.form = MedicineForm::Cream;
        assert!(med.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_schedule() {
        let mut med = tablet_medicine();
        med.schedule.clear();
        assert!(med.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_dose() {
        let mut med = tablet_medicine();
        med.dose.quantity_per_dose = 0.0;
        assert!(med.validate().is_err());
    }

    #[test]
    fn test_hhmm() {
        assert!(is_valid_hhmm("08:00"));
        assert!(is_valid_hhmm("23:59"));
        assert!(!is_valid_hhmm("24:00"));
        assert!(!is_valid_hhmm("8:00"));
        assert!(!is_valid_hhmm("08-00"));
    }

    #[test]
    fn test_inventory_exhaustion() {
        let quota = Inventory::Quota {
            total_required: 10.0,
            consumed: 10.0,
        };
        assert!(quota.is_exhausted());
        let stock = Inventory::Stock {
            on_hand: 0.0,
            low_stock_threshold: 5.0,
        };
        assert!(!stock.is_exhausted());
    }
}
