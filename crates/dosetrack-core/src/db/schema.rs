//! SQLite schema definition.

/// Complete database schema for DoseTrack.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    caregiver_id TEXT NOT NULL,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL CHECK (gender IN ('male', 'female', 'other')),
    relation TEXT NOT NULL,
    avatar_url TEXT,
    theme_color TEXT,
    meal_timings TEXT,                           -- JSON object {breakfast, lunch, dinner}
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_caregiver ON patients(caregiver_id, is_active);

-- ============================================================================
-- Treatment Courses
-- ============================================================================

CREATE TABLE IF NOT EXISTS treatment_courses (
    course_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('acute', 'chronic')),
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'completed', 'paused')),
    duration_in_days INTEGER,                    -- acute courses only
    start_date TEXT NOT NULL,
    end_date TEXT,                               -- derived: start_date + duration_in_days
    notes TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_courses_patient ON treatment_courses(patient_id, is_active);
CREATE INDEX IF NOT EXISTS idx_courses_status ON treatment_courses(status);

-- ============================================================================
-- Medicines
-- ============================================================================

-- Counter columns are mutually exclusive by consumption model:
-- stock/low_stock_threshold for standalone or chronic-course medicines,
-- total_quantity_required/consumed_quantity for acute-course medicines.
CREATE TABLE IF NOT EXISTS medicines (
    medicine_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    course_id TEXT REFERENCES treatment_courses(course_id),
    name TEXT NOT NULL,
    form TEXT NOT NULL CHECK (form IN ('tablet', 'syrup', 'injection', 'drops', 'cream', 'inhaler')),
    strength TEXT,
    quantity_per_dose REAL NOT NULL,
    unit TEXT NOT NULL,
    schedule TEXT NOT NULL DEFAULT '[]',         -- JSON array of intake slots
    stock REAL,
    low_stock_threshold REAL,
    total_quantity_required REAL,
    consumed_quantity REAL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_medicines_patient ON medicines(patient_id, is_active);
CREATE INDEX IF NOT EXISTS idx_medicines_course ON medicines(course_id);

-- ============================================================================
-- Dose Logs (Append-Only Ledger)
-- ============================================================================

CREATE TABLE IF NOT EXISTS dose_logs (
    log_id TEXT PRIMARY KEY,
    medicine_id TEXT NOT NULL REFERENCES medicines(medicine_id),
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    status TEXT NOT NULL CHECK (status IN ('taken', 'skipped', 'missed')),
    slot TEXT NOT NULL CHECK (slot IN ('morning', 'afternoon', 'evening')),
    scheduled_for TEXT NOT NULL,                 -- UTC midnight of the scheduled day
    taken_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Idempotency anchor: at most one log per medicine per slot per calendar day
CREATE UNIQUE INDEX IF NOT EXISTS idx_dose_logs_slot_day
    ON dose_logs(medicine_id, slot, scheduled_for);

-- Most common read path: patient history, newest first
CREATE INDEX IF NOT EXISTS idx_dose_logs_patient_date
    ON dose_logs(patient_id, scheduled_for DESC);

-- ============================================================================
-- Health Logs
-- ============================================================================

CREATE TABLE IF NOT EXISTS health_logs (
    log_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    vital TEXT NOT NULL CHECK (vital IN ('blood_sugar', 'blood_pressure', 'weight', 'heart_rate', 'spo2')),
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    notes TEXT,
    recorded_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_health_logs_patient_date
    ON health_logs(patient_id, recorded_at DESC);
"#;
