//! SQLite schema definition.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    sex TEXT
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name COLLATE NOCASE);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER REFERENCES patients(id),
    visit_date TEXT DEFAULT (datetime('now', 'localtime')),
    age INTEGER,
    address TEXT,
    status TEXT,
    history TEXT,
    pe TEXT,
    diagnosis TEXT,
    management TEXT,
    remarks TEXT
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
"#;

/// Columns added after the first release, checked on every open.
///
/// Each entry is `(table, column, column definition)`.
pub const ADDED_COLUMNS: &[(&str, &str, &str)] = &[("visits", "remarks", "TEXT")];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_visit_date_defaults_to_now() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute("INSERT INTO patients (name) VALUES ('Ana')", [])
            .unwrap();
        conn.execute("INSERT INTO visits (patient_id) VALUES (1)", [])
            .unwrap();

        let date: String = conn
            .query_row("SELECT visit_date FROM visits WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(date.len(), 19);
        assert_eq!(&date[10..11], " ");
    }

    #[test]
    fn test_visit_requires_existing_patient() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute("INSERT INTO visits (patient_id) VALUES (42)", []);
        assert!(result.is_err());
    }
}
