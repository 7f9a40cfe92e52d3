//! CSV mirror of the patient/visit join, rebuilt after every write.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::db::{Database, DbError, ExportRow};
use crate::observer::{Mutation, MutationObserver, ObserverError};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ExportResult<T> = Result<T, ExportError>;

/// CSV column header, in output order.
pub const EXPORT_HEADER: &str = "patient_id,name,sex,visit_id,visit_date,visit_age,\
                                 address,status,history,pe,diagnosis,management,remarks";

/// Full snapshot of the store, one row per (patient, visit) pair.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    pub rows: Vec<ExportRow>,
}

impl ExportSnapshot {
    /// Read a snapshot from the database.
    pub fn capture(db: &Database) -> ExportResult<Self> {
        Ok(Self {
            rows: db.export_rows()?,
        })
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str(EXPORT_HEADER);
        csv.push('\n');

        for row in &self.rows {
            let fields = [
                row.patient_id.to_string(),
                escape_csv(&row.name),
                opt_csv(&row.sex),
                row.visit_id.map(|id| id.to_string()).unwrap_or_default(),
                opt_csv(&row.visit_date),
                row.visit_age.map(|age| age.to_string()).unwrap_or_default(),
                opt_csv(&row.address),
                opt_csv(&row.status),
                opt_csv(&row.history),
                opt_csv(&row.pe),
                opt_csv(&row.diagnosis),
                opt_csv(&row.management),
                opt_csv(&row.remarks),
            ];
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        csv
    }
}

/// Writes the CSV snapshot to a fixed path.
pub struct ExportMirror {
    path: PathBuf,
}

impl ExportMirror {
    /// Create a mirror targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rebuild the export file from scratch.
    ///
    /// The CSV is written to a sibling temp file and renamed into place, so
    /// readers never observe a partial file.
    pub fn rebuild(&self, db: &Database) -> ExportResult<usize> {
        let snapshot = ExportSnapshot::capture(db)?;
        let csv = snapshot.to_csv();

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export.csv".to_string());
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        fs::write(&tmp_path, csv.as_bytes()).map_err(|source| ExportError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            ExportError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!(
            path = %self.path.display(),
            rows = snapshot.rows.len(),
            "export mirror rebuilt"
        );
        Ok(snapshot.rows.len())
    }
}

impl MutationObserver for ExportMirror {
    fn name(&self) -> &str {
        "export-mirror"
    }

    fn on_mutation(&self, db: &Database, _mutation: &Mutation) -> Result<(), ObserverError> {
        self.rebuild(db)?;
        Ok(())
    }
}

fn opt_csv(value: &Option<String>) -> String {
    value.as_deref().map(escape_csv).unwrap_or_default()
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
