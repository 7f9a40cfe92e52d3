//! Post-mutation notifications.
//!
//! The [`Clinic`](crate::Clinic) service calls every registered observer after a
//! write has been committed. Observers see the same connection the write went
//! through, so they can read a consistent snapshot.

use std::fmt;

use crate::db::Database;

/// A committed change to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    PatientCreated { patient_id: i64 },
    PatientUpdated { patient_id: i64 },
    PatientDeleted { patient_id: i64 },
    VisitCreated { patient_id: i64, visit_id: i64 },
    VisitUpdated { visit_id: i64 },
    VisitDeleted { visit_id: i64 },
    /// No write happened; observers should bring themselves up to date.
    Resync,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::PatientCreated { patient_id } => write!(f, "patient {} created", patient_id),
            Mutation::PatientUpdated { patient_id } => write!(f, "patient {} updated", patient_id),
            Mutation::PatientDeleted { patient_id } => write!(f, "patient {} deleted", patient_id),
            Mutation::VisitCreated {
                patient_id,
                visit_id,
            } => write!(f, "visit {} created for patient {}", visit_id, patient_id),
            Mutation::VisitUpdated { visit_id } => write!(f, "visit {} updated", visit_id),
            Mutation::VisitDeleted { visit_id } => write!(f, "visit {} deleted", visit_id),
            Mutation::Resync => write!(f, "resync"),
        }
    }
}

/// Error reported by an observer. Never fails the originating write.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Receives a callback after every successful mutation.
pub trait MutationObserver: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// React to a committed mutation.
    fn on_mutation(&self, db: &Database, mutation: &Mutation) -> Result<(), ObserverError>;
}
