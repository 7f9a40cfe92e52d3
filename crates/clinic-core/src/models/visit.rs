//! Visit models.

use serde::{Deserialize, Serialize};

use crate::ClinicError;

/// A stored clinical encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Auto-assigned row ID
    pub id: i64,
    /// Owning patient ID
    pub patient_id: i64,
    /// Visit timestamp as stored (`YYYY-MM-DD HH:MM:SS` when defaulted)
    pub visit_date: String,
    /// Age at the time of the visit
    pub age: Option<i64>,
    pub address: Option<String>,
    pub status: Option<String>,
    /// History of present illness
    pub history: String,
    /// Physical examination findings
    pub pe: String,
    pub diagnosis: String,
    pub management: String,
    pub remarks: String,
}

/// Age as it arrives over the wire: a number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AgeInput {
    Years(i64),
    Text(String),
}

/// Raw visit payload, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisitInput {
    pub visit_date: Option<String>,
    pub age: Option<AgeInput>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub history: Option<String>,
    pub pe: Option<String>,
    pub diagnosis: Option<String>,
    pub management: Option<String>,
    pub remarks: Option<String>,
}

/// Normalized visit fields, ready to be written.
///
/// Optional categorical fields are `None` when blank; free-text fields are
/// empty strings when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitFields {
    /// `None` keeps the stored date on update and defaults to now on insert
    pub visit_date: Option<String>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub history: String,
    pub pe: String,
    pub diagnosis: String,
    pub management: String,
    pub remarks: String,
}

impl VisitInput {
    /// Validate and normalize the payload.
    pub fn normalize(self) -> Result<VisitFields, ClinicError> {
        let age = match self.age {
            None => None,
            Some(AgeInput::Years(years)) => Some(years),
            Some(AgeInput::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(text.parse::<i64>().map_err(|_| {
                        ClinicError::Validation(format!("Invalid age: {}", text))
                    })?)
                }
            }
        };

        Ok(VisitFields {
            visit_date: non_blank(self.visit_date),
            age,
            address: non_blank(self.address),
            status: non_blank(self.status),
            history: self.history.unwrap_or_default(),
            pe: self.pe.unwrap_or_default(),
            diagnosis: self.diagnosis.unwrap_or_default(),
            management: self.management.unwrap_or_default(),
            remarks: self.remarks.unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults() {
        let fields = VisitInput::default().normalize().unwrap();
        assert_eq!(fields.visit_date, None);
        assert_eq!(fields.age, None);
        assert_eq!(fields.address, None);
        assert_eq!(fields.history, "");
        assert_eq!(fields.remarks, "");
    }

    #[test]
    fn test_age_from_json_number_or_string() {
        let input: VisitInput = serde_json::from_str(r#"{"age": 34}"#).unwrap();
        assert_eq!(input.normalize().unwrap().age, Some(34));

        let input: VisitInput = serde_json::from_str(r#"{"age": " 7 "}"#).unwrap();
        assert_eq!(input.normalize().unwrap().age, Some(7));

        let input: VisitInput = serde_json::from_str(r#"{"age": ""}"#).unwrap();
        assert_eq!(input.normalize().unwrap().age, None);

        let input: VisitInput = serde_json::from_str(r#"{"age": null}"#).unwrap();
        assert_eq!(input.normalize().unwrap().age, None);
    }

    #[test]
    fn test_invalid_age_rejected() {
        let input: VisitInput = serde_json::from_str(r#"{"age": "forty"}"#).unwrap();
        assert!(matches!(input.normalize(), Err(ClinicError::Validation(_))));
    }

    #[test]
    fn test_blank_address_and_status_are_none() {
        let input = VisitInput {
            address: Some("  ".into()),
            status: Some("".into()),
            visit_date: Some("".into()),
            ..Default::default()
        };
        let fields = input.normalize().unwrap();
        assert_eq!(fields.address, None);
        assert_eq!(fields.status, None);
        assert_eq!(fields.visit_date, None);
    }
}
