//! Denormalized patient/visit snapshot query.

use serde::{Deserialize, Serialize};

use super::visits::read_age;
use super::{Database, DbResult};

/// One patient joined with one of their visits.
///
/// Visit columns are `None` for patients without visits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportRow {
    pub patient_id: i64,
    pub name: String,
    pub sex: Option<String>,
    pub visit_id: Option<i64>,
    pub visit_date: Option<String>,
    pub visit_age: Option<i64>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub history: Option<String>,
    pub pe: Option<String>,
    pub diagnosis: Option<String>,
    pub management: Option<String>,
    pub remarks: Option<String>,
}

impl Database {
    /// Every (patient, visit) pair, patients without visits included.
    ///
    /// Ordered by patient name (case-insensitive), then newest visit first.
    pub fn export_rows(&self) -> DbResult<Vec<ExportRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.sex,
                   v.id, v.visit_date, v.age, v.address, v.status,
                   v.history, v.pe, v.diagnosis, v.management, v.remarks
            FROM patients p
            LEFT JOIN visits v ON p.id = v.patient_id
            ORDER BY p.name COLLATE NOCASE ASC, p.id ASC,
                     datetime(v.visit_date) DESC, v.id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ExportRow {
                patient_id: row.get(0)?,
                name: row.get(1)?,
                sex: row.get(2)?,
                visit_id: row.get(3)?,
                visit_date: row.get(4)?,
                visit_age: read_age(row, 5)?,
                address: row.get(6)?,
                status: row.get(7)?,
                history: row.get(8)?,
                pe: row.get(9)?,
                diagnosis: row.get(10)?,
                management: row.get(11)?,
                remarks: row.get(12)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
