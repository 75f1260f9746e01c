//! Medicine database operations, including the atomic counter mutations used
//! by the dose logging engine.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Dose, Inventory, Medicine, MedicineForm, ScheduleSlot};

impl Database {
    /// Insert a new medicine.
    pub fn insert_medicine(&self, medicine: &Medicine) -> DbResult<()> {
        let schedule = serde_json::to_string(&medicine.schedule)?;
        let (stock, threshold, total, consumed) = counter_columns(&medicine.inventory);

        self.conn.execute(
            r#"
            INSERT INTO medicines (
                medicine_id, patient_id, course_id, name, form, strength,
                quantity_per_dose, unit, schedule,
                stock, low_stock_threshold, total_quantity_required, consumed_quantity,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                medicine.medicine_id,
                medicine.patient_id,
                medicine.course_id,
                medicine.name,
                medicine.form.as_str(),
                medicine.dose.strength,
                medicine.dose.quantity_per_dose,
                medicine.dose.unit,
                schedule,
                stock,
                threshold,
                total,
                consumed,
                medicine.is_active,
                medicine.created_at,
                medicine.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing medicine, counters included.
    pub fn update_medicine(&self, medicine: &Medicine) -> DbResult<bool> {
        let schedule = serde_json::to_string(&medicine.schedule)?;
        let (stock, threshold, total, consumed) = counter_columns(&medicine.inventory);

        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicines SET
                course_id = ?2,
                name = ?3,
                form = ?4,
                strength = ?5,
                quantity_per_dose = ?6,
                unit = ?7,
                schedule = ?8,
                stock = ?9,
                low_stock_threshold = ?10,
                total_quantity_required = ?11,
                consumed_quantity = ?12,
                updated_at = datetime('now')
            WHERE medicine_id = ?1
            "#,
            params![
                medicine.medicine_id,
                medicine.course_id,
                medicine.name,
                medicine.form.as_str(),
                medicine.dose.strength,
                medicine.dose.quantity_per_dose,
                medicine.dose.unit,
                schedule,
                stock,
                threshold,
                total,
                consumed,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a medicine by ID, active or not. Callers decide whether the
    /// soft-delete flag matters for their operation.
    pub fn get_medicine(&self, medicine_id: &str) -> DbResult<Option<Medicine>> {
        get_medicine(&self.conn, medicine_id)
    }

    /// List a patient's active medicines, newest first.
    pub fn list_medicines_for_patient(&self, patient_id: &str) -> DbResult<Vec<Medicine>> {
        self.list_medicines("patient_id", patient_id)
    }

    /// List a course's active medicines.
    pub fn list_medicines_for_course(&self, course_id: &str) -> DbResult<Vec<Medicine>> {
        self.list_medicines("course_id", course_id)
    }

    fn list_medicines(&self, key: &str, value: &str) -> DbResult<Vec<Medicine>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT medicine_id, patient_id, course_id, name, form, strength,
                   quantity_per_dose, unit, schedule,
                   stock, low_stock_threshold, total_quantity_required, consumed_quantity,
                   is_active, created_at, updated_at
            FROM medicines
            WHERE {key} = ? AND is_active = 1
            ORDER BY created_at DESC
            "#
        ))?;

        let rows = stmt.query_map([value], medicine_row)?;

        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?.try_into()?);
        }
        Ok(medicines)
    }

    /// Soft-delete a medicine.
    pub fn soft_delete_medicine(&self, medicine_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE medicines SET is_active = 0, updated_at = datetime('now')
             WHERE medicine_id = ? AND is_active = 1",
            [medicine_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Atomically subtract `amount` from stock iff enough is on hand.
    pub fn decrement_stock(&self, medicine_id: &str, amount: f64) -> DbResult<bool> {
        decrement_stock(&self.conn, medicine_id, amount)
    }

    /// Atomically add `amount` to the consumed quota.
    pub fn increment_consumed(&self, medicine_id: &str, amount: f64) -> DbResult<bool> {
        increment_consumed(&self.conn, medicine_id, amount)
    }

    /// Resize an acute-course quota, preserving the consumed counter and
    /// clearing any stock fields.
    pub fn set_quota(&self, medicine_id: &str, total_required: f64) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicines SET
                total_quantity_required = ?2,
                consumed_quantity = COALESCE(consumed_quantity, 0),
                stock = NULL,
                low_stock_threshold = NULL,
                updated_at = datetime('now')
            WHERE medicine_id = ?1
            "#,
            params![medicine_id, total_required],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Fetch a medicine over any connection (plain or transactional).
pub(crate) fn get_medicine(conn: &Connection, medicine_id: &str) -> DbResult<Option<Medicine>> {
    conn.query_row(
        r#"
        SELECT medicine_id, patient_id, course_id, name, form, strength,
               quantity_per_dose, unit, schedule,
               stock, low_stock_threshold, total_quantity_required, consumed_quantity,
               is_active, created_at, updated_at
        FROM medicines
        WHERE medicine_id = ?
        "#,
        [medicine_id],
        medicine_row,
    )
    .optional()?
    .map(Medicine::try_from)
    .transpose()
}

/// Conditional compare-and-set decrement: a single UPDATE guarded by
/// `stock >= amount`, so concurrent submissions can never both pass a stale
/// sufficiency check. Returns false when the row is missing, quota-tracked,
/// or short on stock.
pub(crate) fn decrement_stock(
    conn: &Connection,
    medicine_id: &str,
    amount: f64,
) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE medicines SET
            stock = stock - ?1,
            updated_at = datetime('now')
        WHERE medicine_id = ?2 AND stock IS NOT NULL AND stock >= ?1
        "#,
        params![amount, medicine_id],
    )?;
    Ok(rows_affected > 0)
}

/// Unconditional atomic add to the consumed quota. Overshoot past the total
/// is tolerated here; course completion surfaces it.
pub(crate) fn increment_consumed(
    conn: &Connection,
    medicine_id: &str,
    amount: f64,
) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE medicines SET
            consumed_quantity = COALESCE(consumed_quantity, 0) + ?1,
            updated_at = datetime('now')
        WHERE medicine_id = ?2 AND total_quantity_required IS NOT NULL
        "#,
        params![amount, medicine_id],
    )?;
    Ok(rows_affected > 0)
}

/// Current (stock, low_stock_threshold) for a stock-tracked medicine.
pub(crate) fn stock_level(
    conn: &Connection,
    medicine_id: &str,
) -> DbResult<Option<(f64, f64)>> {
    let level = conn
        .query_row(
            "SELECT stock, COALESCE(low_stock_threshold, 0) FROM medicines WHERE medicine_id = ?",
            [medicine_id],
            |row| {
                let stock: Option<f64> = row.get(0)?;
                let threshold: f64 = row.get(1)?;
                Ok(stock.map(|s| (s, threshold)))
            },
        )
        .optional()?;
    Ok(level.flatten())
}

fn counter_columns(inventory: &Inventory) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
    match inventory {
        Inventory::Stock {
            on_hand,
            low_stock_threshold,
        } => (Some(*on_hand), Some(*low_stock_threshold), None, None),
        Inventory::Quota {
            total_required,
            consumed,
        } => (None, None, Some(*total_required), Some(*consumed)),
    }
}

/// Intermediate row struct for database mapping.
struct MedicineRow {
    medicine_id: String,
    patient_id: String,
    course_id: Option<String>,
    name: String,
    form: String,
    strength: Option<String>,
    quantity_per_dose: f64,
    unit: String,
    schedule: String,
    stock: Option<f64>,
    low_stock_threshold: Option<f64>,
    total_quantity_required: Option<f64>,
    consumed_quantity: Option<f64>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

fn medicine_row(row: &Row<'_>) -> rusqlite::Result<MedicineRow> {
    Ok(MedicineRow {
        medicine_id: row.get(0)?,
        patient_id: row.get(1)?,
        course_id: row.get(2)?,
        name: row.get(3)?,
        form: row.get(4)?,
        strength: row.get(5)?,
        quantity_per_dose: row.get(6)?,
        unit: row.get(7)?,
        schedule: row.get(8)?,
        stock: row.get(9)?,
        low_stock_threshold: row.get(10)?,
        total_quantity_required: row.get(11)?,
        consumed_quantity: row.get(12)?,
        is_active: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

impl TryFrom<MedicineRow> for Medicine {
    type Error = DbError;

    fn try_from(row: MedicineRow) -> Result<Self, Self::Error> {
        let form = MedicineForm::parse(&row.form)
            .ok_or_else(|| DbError::Constraint(format!("Unknown medicine form: {}", row.form)))?;
        let schedule: Vec<ScheduleSlot> = serde_json::from_str(&row.schedule)?;

        // The quota columns are authoritative when present; otherwise the
        // medicine is stock-tracked.
        let inventory = match row.total_quantity_required {
            Some(total_required) => Inventory::Quota {
                total_required,
                consumed: row.consumed_quantity.unwrap_or(0.0),
            },
            None => Inventory::Stock {
                on_hand: row.stock.unwrap_or(0.0),
                low_stock_threshold: row
                    .low_stock_threshold
                    .unwrap_or(crate::models::DEFAULT_LOW_STOCK_THRESHOLD),
            },
        };

        Ok(Medicine {
            medicine_id: row.medicine_id,
            patient_id: row.patient_id,
            course_id: row.course_id,
            name: row.name,
            form,
            dose: Dose {
                strength: row.strength,
                quantity_per_dose: row.quantity_per_dose,
                unit: row.unit,
            },
            schedule,
            inventory,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
