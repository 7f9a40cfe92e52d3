//! Clinic Core Library
//!
//! Patient and visit records for a small clinic, with a CSV mirror and
//! medical certificate generation.
//!
//! # Architecture
//!
//! ```text
//!   HTTP handlers
//!        │
//!        ▼
//!   ┌─────────┐   write    ┌──────────┐
//!   │ Clinic  │──────────▶│ Database │ (SQLite)
//!   └────┬────┘           └────┬─────┘
//!        │ after commit         │ snapshot
//!        ▼                      ▼
//!   MutationObserver ──▶ ExportMirror ──▶ clinic.csv
//!
//!   Clinic::certificate ──▶ CertificateFiller ──▶ .docx bytes
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, Visit, inputs)
//! - [`observer`]: Post-write notification hook
//! - [`export`]: CSV mirror of the full store
//! - [`certificate`]: `.docx` medical certificate filler

pub mod certificate;
pub mod db;
pub mod export;
pub mod models;
pub mod observer;

// Re-export commonly used types
pub use certificate::{CertificateError, CertificateFiller, CertificateTemplate, RunStyle};
pub use db::{Database, DbError};
pub use export::{ExportError, ExportMirror};
pub use models::{AgeInput, NewPatient, Patient, Visit, VisitFields, VisitInput};
pub use observer::{Mutation, MutationObserver};

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Errors surfaced by the clinic service.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Lock(e.to_string())
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;

/// Thread-safe entry point for every record operation.
///
/// Writes go through the single connection behind the mutex. Registered
/// observers run after each committed write, still holding the lock, so they
/// see exactly the state the write produced.
pub struct Clinic {
    db: Arc<Mutex<Database>>,
    observers: Vec<Arc<dyn MutationObserver>>,
    certificates: CertificateFiller,
}

impl Clinic {
    pub fn new(db: Database, certificates: CertificateFiller) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            observers: Vec::new(),
            certificates,
        }
    }

    /// Register an observer called after every successful write.
    pub fn with_observer(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// In-memory store with the built-in certificate template.
    pub fn open_in_memory() -> ClinicResult<Self> {
        let filler = CertificateFiller::new(CertificateTemplate::builtin()?, RunStyle::default());
        Ok(Self::new(Database::open_in_memory()?, filler))
    }

    fn notify(&self, db: &Database, mutation: Mutation) {
        tracing::info!(%mutation, "record changed");
        for observer in &self.observers {
            if let Err(e) = observer.on_mutation(db, &mutation) {
                tracing::warn!(
                    observer = observer.name(),
                    %mutation,
                    error = %e,
                    "observer failed"
                );
            }
        }
    }

    /// Run every observer once without a triggering write, e.g. at startup.
    pub fn sync_observers(&self) -> ClinicResult<()> {
        let db = self.db.lock()?;
        for observer in &self.observers {
            if let Err(e) = observer.on_mutation(&db, &Mutation::Resync) {
                tracing::warn!(observer = observer.name(), error = %e, "observer resync failed");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Create a patient and return the stored record.
    pub fn create_patient(&self, name: &str, sex: Option<&str>) -> ClinicResult<Patient> {
        let input = NewPatient::new(name, sex)?;
        let db = self.db.lock()?;
        let id = db.insert_patient(&input)?;
        self.notify(&db, Mutation::PatientCreated { patient_id: id });

        Ok(Patient {
            id,
            name: input.name,
            sex: input.sex,
        })
    }

    pub fn get_patient(&self, id: i64) -> ClinicResult<Patient> {
        let db = self.db.lock()?;
        db.get_patient(id)?.ok_or_else(|| patient_not_found(id))
    }

    /// Replace a patient's name and sex.
    pub fn update_patient(&self, id: i64, name: &str, sex: Option<&str>) -> ClinicResult<Patient> {
        let input = NewPatient::new(name, sex)?;
        let db = self.db.lock()?;
        if !db.update_patient(id, &input)? {
            return Err(patient_not_found(id));
        }
        self.notify(&db, Mutation::PatientUpdated { patient_id: id });

        Ok(Patient {
            id,
            name: input.name,
            sex: input.sex,
        })
    }

    /// Delete a patient together with all of their visits.
    pub fn delete_patient(&self, id: i64) -> ClinicResult<()> {
        let mut db = self.db.lock()?;
        if !db.delete_patient_cascade(id)? {
            return Err(patient_not_found(id));
        }
        self.notify(&db, Mutation::PatientDeleted { patient_id: id });
        Ok(())
    }

    /// All patients, ordered by name (case-insensitive).
    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let db = self.db.lock()?;
        Ok(db.list_patients(None)?)
    }

    /// Patients whose name contains `query`; a blank query lists everyone.
    pub fn search_patients(&self, query: &str) -> ClinicResult<Vec<Patient>> {
        let query = query.trim();
        let db = self.db.lock()?;
        let filter = (!query.is_empty()).then_some(query);
        Ok(db.list_patients(filter)?)
    }

    // =========================================================================
    // Visits
    // =========================================================================

    /// Record a visit for an existing patient.
    pub fn add_visit(&self, patient_id: i64, input: VisitInput) -> ClinicResult<Visit> {
        let fields = input.normalize()?;
        let db = self.db.lock()?;
        if !db.patient_exists(patient_id)? {
            return Err(patient_not_found(patient_id));
        }

        let visit_id = db.insert_visit(patient_id, &fields)?;
        self.notify(
            &db,
            Mutation::VisitCreated {
                patient_id,
                visit_id,
            },
        );

        db.get_visit(visit_id)?.ok_or_else(|| visit_not_found(visit_id))
    }

    pub fn get_visit(&self, id: i64) -> ClinicResult<Visit> {
        let db = self.db.lock()?;
        db.get_visit(id)?.ok_or_else(|| visit_not_found(id))
    }

    /// Replace a visit's fields. A missing date keeps the stored one.
    pub fn update_visit(&self, id: i64, input: VisitInput) -> ClinicResult<Visit> {
        let fields = input.normalize()?;
        let db = self.db.lock()?;
        if !db.update_visit(id, &fields)? {
            return Err(visit_not_found(id));
        }
        self.notify(&db, Mutation::VisitUpdated { visit_id: id });

        db.get_visit(id)?.ok_or_else(|| visit_not_found(id))
    }

    pub fn delete_visit(&self, id: i64) -> ClinicResult<()> {
        let db = self.db.lock()?;
        if !db.delete_visit(id)? {
            return Err(visit_not_found(id));
        }
        self.notify(&db, Mutation::VisitDeleted { visit_id: id });
        Ok(())
    }

    /// Visits of a patient, newest first.
    pub fn list_visits(&self, patient_id: i64) -> ClinicResult<Vec<Visit>> {
        let db = self.db.lock()?;
        if !db.patient_exists(patient_id)? {
            return Err(patient_not_found(patient_id));
        }
        Ok(db.list_visits(patient_id)?)
    }

    // =========================================================================
    // Certificates
    // =========================================================================

    /// Fill the certificate template for a visit.
    ///
    /// Returns the owning patient alongside the `.docx` bytes so callers can
    /// name the download.
    pub fn certificate(&self, visit_id: i64) -> ClinicResult<(Patient, Vec<u8>)> {
        let (patient, visit) = {
            let db = self.db.lock()?;
            let visit = db.get_visit(visit_id)?.ok_or_else(|| visit_not_found(visit_id))?;
            let patient = db
                .get_patient(visit.patient_id)?
                .ok_or_else(|| patient_not_found(visit.patient_id))?;
            (patient, visit)
        };

        let bytes = self.certificates.fill(&patient, &visit)?;
        tracing::info!(visit_id, patient_id = patient.id, "certificate generated");
        Ok((patient, bytes))
    }
}

fn patient_not_found(id: i64) -> ClinicError {
    ClinicError::NotFound(format!("Patient {} not found", id))
}

fn visit_not_found(id: i64) -> ClinicError {
    ClinicError::NotFound(format!("Visit {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl MutationObserver for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn on_mutation(&self, _db: &Database, _m: &Mutation) -> Result<(), observer::ObserverError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl MutationObserver for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_mutation(&self, _db: &Database, _m: &Mutation) -> Result<(), observer::ObserverError> {
            Err("disk full".into())
        }
    }

    #[test]
    fn test_observers_run_on_writes_only() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let clinic = Clinic::open_in_memory().unwrap().with_observer(counter.clone());

        let p = clinic.create_patient("Ann", None).unwrap();
        clinic.list_patients().unwrap();
        clinic.get_patient(p.id).unwrap();
        let v = clinic.add_visit(p.id, VisitInput::default()).unwrap();
        clinic.update_visit(v.id, VisitInput::default()).unwrap();
        clinic.delete_visit(v.id).unwrap();
        clinic.delete_patient(p.id).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_failed_validation_does_not_notify() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let clinic = Clinic::open_in_memory().unwrap().with_observer(counter.clone());

        assert!(matches!(
            clinic.create_patient("   ", None),
            Err(ClinicError::Validation(_))
        ));
        assert!(matches!(
            clinic.add_visit(99, VisitInput::default()),
            Err(ClinicError::NotFound(_))
        ));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_failure_does_not_fail_write() {
        let clinic = Clinic::open_in_memory()
            .unwrap()
            .with_observer(Arc::new(Failing));

        let p = clinic.create_patient("Ann", Some("F")).unwrap();
        assert_eq!(clinic.get_patient(p.id).unwrap().name, "Ann");
    }

    #[test]
    fn test_update_missing_patient() {
        let clinic = Clinic::open_in_memory().unwrap();
        assert!(matches!(
            clinic.update_patient(42, "Ann", None),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(clinic.delete_patient(42), Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn test_certificate_for_missing_visit() {
        let clinic = Clinic::open_in_memory().unwrap();
        assert!(matches!(clinic.certificate(1), Err(ClinicError::NotFound(_))));
    }
}
