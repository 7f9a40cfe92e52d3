//! Visit database operations.

use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Visit, VisitFields};

const VISIT_COLUMNS: &str = "id, patient_id, visit_date, age, address, status, \
                             history, pe, diagnosis, management, remarks";

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        visit_date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        age: read_age(row, 3)?,
        address: row.get(4)?,
        status: row.get(5)?,
        history: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        pe: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        diagnosis: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        management: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        remarks: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
    })
}

/// Read an `age` column leniently.
///
/// Databases written by older releases stored the form value unvalidated,
/// so the column may hold text like `"34 yrs"` or a real number.
pub(super) fn read_age(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    let age = match row.get::<_, Value>(idx)? {
        Value::Null => None,
        Value::Integer(years) => Some(years),
        Value::Real(years) if years.is_finite() => Some(years.trunc() as i64),
        Value::Text(text) => {
            let text = text.trim();
            let parsed = text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|years| years.is_finite())
                    .map(|years| years.trunc() as i64)
            });
            if parsed.is_none() && !text.is_empty() {
                tracing::warn!(value = text, "ignoring unreadable stored age");
            }
            parsed
        }
        other => {
            tracing::warn!(value = ?other, "ignoring unreadable stored age");
            None
        }
    };
    Ok(age)
}

impl Database {
    /// Insert a visit for a patient, returning its ID.
    ///
    /// Without a visit date the column default (local now) applies.
    pub fn insert_visit(&self, patient_id: i64, visit: &VisitFields) -> DbResult<i64> {
        match &visit.visit_date {
            Some(visit_date) => self.conn.execute(
                r#"
                INSERT INTO visits (
                    patient_id, visit_date, age, address, status,
                    history, pe, diagnosis, management, remarks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    patient_id,
                    visit_date,
                    visit.age,
                    visit.address,
                    visit.status,
                    visit.history,
                    visit.pe,
                    visit.diagnosis,
                    visit.management,
                    visit.remarks,
                ],
            )?,
            None => self.conn.execute(
                r#"
                INSERT INTO visits (
                    patient_id, age, address, status,
                    history, pe, diagnosis, management, remarks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    patient_id,
                    visit.age,
                    visit.address,
                    visit.status,
                    visit.history,
                    visit.pe,
                    visit.diagnosis,
                    visit.management,
                    visit.remarks,
                ],
            )?,
        };

        let id = self.conn.last_insert_rowid();
        tracing::debug!(patient_id, visit_id = id, "visit inserted");
        Ok(id)
    }

    /// Overwrite a visit's fields. The stored date is kept when none is given.
    pub fn update_visit(&self, id: i64, visit: &VisitFields) -> DbResult<bool> {
        let rows_affected = match &visit.visit_date {
            Some(visit_date) => self.conn.execute(
                r#"
                UPDATE visits SET
                    visit_date = ?2,
                    age = ?3,
                    address = ?4,
                    status = ?5,
                    history = ?6,
                    pe = ?7,
                    diagnosis = ?8,
                    management = ?9,
                    remarks = ?10
                WHERE id = ?1
                "#,
                params![
                    id,
                    visit_date,
                    visit.age,
                    visit.address,
                    visit.status,
                    visit.history,
                    visit.pe,
                    visit.diagnosis,
                    visit.management,
                    visit.remarks,
                ],
            )?,
            None => self.conn.execute(
                r#"
                UPDATE visits SET
                    age = ?2,
                    address = ?3,
                    status = ?4,
                    history = ?5,
                    pe = ?6,
                    diagnosis = ?7,
                    management = ?8,
                    remarks = ?9
                WHERE id = ?1
                "#,
                params![
                    id,
                    visit.age,
                    visit.address,
                    visit.status,
                    visit.history,
                    visit.pe,
                    visit.diagnosis,
                    visit.management,
                    visit.remarks,
                ],
            )?,
        };
        Ok(rows_affected > 0)
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: i64) -> DbResult<Option<Visit>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM visits WHERE id = ?", VISIT_COLUMNS),
                [id],
                visit_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List a patient's visits, newest first.
    pub fn list_visits(&self, patient_id: i64) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM visits
            WHERE patient_id = ?
            ORDER BY datetime(visit_date) DESC, id DESC
            "#,
            VISIT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], visit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a visit.
    pub fn delete_visit(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM visits WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let patient_id = db
            .insert_patient(&NewPatient::new("Jose Rizal", Some("M")).unwrap())
            .unwrap();
        (db, patient_id)
    }

    fn dated(date: &str) -> VisitFields {
        VisitFields {
            visit_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let (db, patient_id) = setup_db();

        let fields = VisitFields {
            visit_date: Some("2024-03-15 09:30:00".into()),
            age: Some(34),
            address: Some("12 Main St".into()),
            status: Some("Single".into()),
            history: "Cough for 3 days".into(),
            pe: "Clear breath sounds".into(),
            diagnosis: "Acute Bronchitis".into(),
            management: "Rest, fluids".into(),
            remarks: "Fit to work".into(),
        };
        let id = db.insert_visit(patient_id, &fields).unwrap();

        let visit = db.get_visit(id).unwrap().unwrap();
        assert_eq!(visit.patient_id, patient_id);
        assert_eq!(visit.visit_date, "2024-03-15 09:30:00");
        assert_eq!(visit.age, Some(34));
        assert_eq!(visit.address, Some("12 Main St".into()));
        assert_eq!(visit.status, Some("Single".into()));
        assert_eq!(visit.history, "Cough for 3 days");
        assert_eq!(visit.pe, "Clear breath sounds");
        assert_eq!(visit.diagnosis, "Acute Bronchitis");
        assert_eq!(visit.management, "Rest, fluids");
        assert_eq!(visit.remarks, "Fit to work");
    }

    #[test]
    fn test_insert_defaults_date() {
        let (db, patient_id) = setup_db();

        let id = db.insert_visit(patient_id, &VisitFields::default()).unwrap();
        let visit = db.get_visit(id).unwrap().unwrap();

        assert!(!visit.visit_date.is_empty());
        assert_eq!(visit.history, "");
        assert_eq!(visit.address, None);
    }

    #[test]
    fn test_list_newest_first() {
        let (db, patient_id) = setup_db();

        let old = db.insert_visit(patient_id, &dated("2023-01-02 08:00:00")).unwrap();
        let new = db.insert_visit(patient_id, &dated("2024-06-01 10:00:00")).unwrap();
        let mid = db.insert_visit(patient_id, &dated("2024-01-15")).unwrap();

        let ids: Vec<i64> = db
            .list_visits(patient_id)
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![new, mid, old]);
    }

    #[test]
    fn test_list_only_own_visits() {
        let (db, patient_id) = setup_db();
        let other = db
            .insert_patient(&NewPatient::new("Other", None).unwrap())
            .unwrap();

        db.insert_visit(patient_id, &VisitFields::default()).unwrap();
        db.insert_visit(other, &VisitFields::default()).unwrap();

        assert_eq!(db.list_visits(patient_id).unwrap().len(), 1);
        assert_eq!(db.list_visits(other).unwrap().len(), 1);
    }

    #[test]
    fn test_update_keeps_date_when_absent() {
        let (db, patient_id) = setup_db();
        let id = db.insert_visit(patient_id, &dated("2024-03-15 09:30:00")).unwrap();

        let update = VisitFields {
            diagnosis: "Pneumonia".into(),
            ..Default::default()
        };
        assert!(db.update_visit(id, &update).unwrap());

        let visit = db.get_visit(id).unwrap().unwrap();
        assert_eq!(visit.visit_date, "2024-03-15 09:30:00");
        assert_eq!(visit.diagnosis, "Pneumonia");
    }

    #[test]
    fn test_update_replaces_date_when_given() {
        let (db, patient_id) = setup_db();
        let id = db.insert_visit(patient_id, &dated("2024-03-15 09:30:00")).unwrap();

        assert!(db.update_visit(id, &dated("2024-04-01")).unwrap());
        assert_eq!(db.get_visit(id).unwrap().unwrap().visit_date, "2024-04-01");
    }

    #[test]
    fn test_update_and_delete_missing() {
        let (db, _) = setup_db();
        assert!(!db.update_visit(404, &VisitFields::default()).unwrap());
        assert!(!db.delete_visit(404).unwrap());
    }

    #[test]
    fn test_delete_visit() {
        let (db, patient_id) = setup_db();
        let id = db.insert_visit(patient_id, &VisitFields::default()).unwrap();

        assert!(db.delete_visit(id).unwrap());
        assert!(db.get_visit(id).unwrap().is_none());
        assert!(db.get_patient(patient_id).unwrap().is_some());
    }
}
