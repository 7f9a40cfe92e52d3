//! Patient models.

use serde::{Deserialize, Serialize};

use crate::ClinicError;

/// A stored patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Auto-assigned row ID
    pub id: i64,
    /// Display name (trimmed, never empty)
    pub name: String,
    /// Sex as entered (e.g., "M", "F")
    pub sex: Option<String>,
}

/// Fields accepted when creating or updating a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub sex: Option<String>,
}

impl NewPatient {
    /// Build a validated patient input.
    ///
    /// The name is trimmed and must not be empty. A blank sex is stored as NULL.
    pub fn new(name: &str, sex: Option<&str>) -> Result<Self, ClinicError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("Name is required".into()));
        }

        Ok(Self {
            name: name.to_string(),
            sex: sex.filter(|s| !s.is_empty()).map(str::to_string),
        })
    }
}

impl Patient {
    /// Name with spaces replaced, for use in download filenames.
    ///
    /// Quotes, slashes and control characters are dropped.
    pub fn file_safe_name(&self) -> String {
        self.name
            .chars()
            .filter(|c| !matches!(c, '"' | '\\' | '/') && !c.is_control())
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    }
}
