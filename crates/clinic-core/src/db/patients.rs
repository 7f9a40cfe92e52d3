//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{NewPatient, Patient};

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        sex: row.get(2)?,
    })
}

/// Escape `LIKE` wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    /// Insert a new patient, returning its ID.
    pub fn insert_patient(&self, patient: &NewPatient) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO patients (name, sex) VALUES (?1, ?2)",
            params![patient.name, patient.sex],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(patient_id = id, "patient inserted");
        Ok(id)
    }

    /// Update an existing patient.
    pub fn update_patient(&self, id: i64, patient: &NewPatient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET name = ?2, sex = ?3 WHERE id = ?1",
            params![id, patient.name, patient.sex],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                "SELECT id, name, sex FROM patients WHERE id = ?",
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Check whether a patient exists.
    pub fn patient_exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM patients WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// List patients in case-insensitive name order.
    ///
    /// A non-blank filter keeps only names containing it, ignoring case.
    pub fn list_patients(&self, filter: Option<&str>) -> DbResult<Vec<Patient>> {
        let filter = filter.map(str::trim).filter(|q| !q.is_empty());

        let rows = match filter {
            Some(query) => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT id, name, sex
                    FROM patients
                    WHERE name LIKE ?1 ESCAPE '\'
                    ORDER BY name COLLATE NOCASE ASC, id ASC
                    "#,
                )?;
                let rows = stmt.query_map([like_pattern(query)], patient_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT id, name, sex
                    FROM patients
                    ORDER BY name COLLATE NOCASE ASC, id ASC
                    "#,
                )?;
                let rows = stmt.query_map([], patient_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }

    /// Delete a patient and all of their visits in one transaction.
    ///
    /// Returns false when the patient did not exist; nothing is deleted then.
    pub fn delete_patient_cascade(&mut self, id: i64) -> DbResult<bool> {
        let tx = self.transaction()?;

        let visits_deleted = tx.execute("DELETE FROM visits WHERE patient_id = ?", [id])?;
        let patients_deleted = tx.execute("DELETE FROM patients WHERE id = ?", [id])?;

        if patients_deleted == 0 {
            // Dropping the transaction rolls back the visit delete
            return Ok(false);
        }

        tx.commit()?;
        tracing::debug!(patient_id = id, visits_deleted, "patient deleted");
        Ok(true)
    }
}
