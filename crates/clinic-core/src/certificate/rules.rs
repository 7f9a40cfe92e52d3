//! Keyword rules mapping template paragraphs to visit fields.
//!
//! Matching is substring based on lowercased paragraph text. Rules are tried
//! in table order and the first match wins; a paragraph that has been filled
//! is consumed and never matched again.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::blanks::{fill_blanks, has_blank};
use crate::models::{Patient, Visit};

/// How many paragraphs after a section label are searched for its blank.
pub const LOOKAHEAD: usize = 5;

/// Text values derived from a visit, ready to be written into blanks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateFields {
    /// Long-form visit date, e.g. "March 15, 2024"
    pub date: String,
    /// `"{name} {age}/{sex}"`, or the bare name
    pub name_line: String,
    pub address: String,
    pub history: String,
    pub diagnosis: String,
    pub remarks: String,
}

impl CertificateFields {
    /// Derive the certificate values for a visit.
    ///
    /// `today` is used when the stored visit date cannot be parsed.
    pub fn from_visit(patient: &Patient, visit: &Visit, today: NaiveDate) -> Self {
        Self {
            date: display_date(&visit.visit_date, today),
            name_line: name_line(&patient.name, visit.age, patient.sex.as_deref()),
            address: visit.address.clone().unwrap_or_default(),
            history: visit.history.clone(),
            diagnosis: visit.diagnosis.clone(),
            remarks: visit.remarks.clone(),
        }
    }
}

/// Format a stored visit date as "Month Day, Year".
pub fn display_date(visit_date: &str, today: NaiveDate) -> String {
    parse_visit_date(visit_date)
        .unwrap_or(today)
        .format("%B %-d, %Y")
        .to_string()
}

fn parse_visit_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Patient name with an `age/sex` suffix when either is known.
pub fn name_line(name: &str, age: Option<i64>, sex: Option<&str>) -> String {
    let sex = sex.filter(|s| !s.is_empty());
    if age.is_none() && sex.is_none() {
        return name.to_string();
    }

    format!(
        "{} {}/{}",
        name,
        age.map(|a| a.to_string()).unwrap_or_default(),
        sex.unwrap_or_default()
    )
}

/// What a matching rule writes.
enum Fill {
    /// Fill the blanks of the matched paragraph itself, in order.
    InPlace(Vec<String>),
    /// Fill the first blank in the paragraphs following the label.
    Lookahead(String),
}

struct Rule {
    name: &'static str,
    /// Whether the matched paragraph must itself contain a blank
    needs_blank: bool,
    matches: fn(&str) -> bool,
    fill: fn(&CertificateFields) -> Fill,
}

const RULES: &[Rule] = &[
    Rule {
        name: "date",
        needs_blank: true,
        matches: |text| text.contains("date"),
        fill: |fields| Fill::InPlace(vec![fields.date.clone()]),
    },
    Rule {
        name: "certify",
        needs_blank: true,
        matches: |text| text.contains("certify that") || text.contains("this is to certify"),
        fill: |fields| Fill::InPlace(vec![fields.name_line.clone(), fields.address.clone()]),
    },
    Rule {
        name: "history",
        needs_blank: true,
        matches: |text| text.contains("examined") && text.contains("due to"),
        fill: |fields| Fill::InPlace(vec![format!(" {}", fields.history)]),
    },
    Rule {
        name: "impression",
        needs_blank: false,
        matches: |text| text.trim().starts_with("impression"),
        fill: |fields| Fill::Lookahead(fields.diagnosis.clone()),
    },
    Rule {
        name: "remarks",
        needs_blank: false,
        matches: |text| text.trim().starts_with("remarks"),
        fill: |fields| Fill::Lookahead(fields.remarks.clone()),
    },
];

/// New text for one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphEdit {
    pub index: usize,
    pub text: String,
}

/// Decide which paragraphs to rewrite, in a single pass over the texts.
pub fn plan_fills<S: AsRef<str>>(paragraphs: &[S], fields: &CertificateFields) -> Vec<ParagraphEdit> {
    let mut texts: Vec<String> = paragraphs.iter().map(|p| p.as_ref().to_string()).collect();
    let mut consumed: BTreeSet<usize> = BTreeSet::new();
    let mut edits = Vec::new();

    for index in 0..texts.len() {
        if consumed.contains(&index) {
            continue;
        }

        let lower = texts[index].to_lowercase();
        let blank = has_blank(&texts[index]);

        let Some(rule) = RULES
            .iter()
            .find(|rule| (rule.matches)(&lower) && (blank || !rule.needs_blank))
        else {
            continue;
        };

        let (target, text) = match (rule.fill)(fields) {
            Fill::InPlace(values) => (index, fill_blanks(&texts[index], &values)),
            Fill::Lookahead(value) => {
                let last = (index + LOOKAHEAD).min(texts.len() - 1);
                let found = (index + 1..=last)
                    .filter(|i| !consumed.contains(i))
                    .find(|&i| has_blank(&texts[i]));

                match found {
                    Some(target) => (target, fill_blanks(&texts[target], &[value])),
                    None => {
                        tracing::debug!(
                            rule = rule.name,
                            paragraph = index,
                            "no blank found after section label"
                        );
                        continue;
                    }
                }
            }
        };

        tracing::trace!(rule = rule.name, paragraph = target, "filled blank");
        consumed.insert(index);
        consumed.insert(target);
        texts[target] = text.clone();
        edits.push(ParagraphEdit {
            index: target,
            text,
        });
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CertificateFields {
        CertificateFields {
            date: "March 15, 2024".into(),
            name_line: "Jane Doe 34/F".into(),
            address: "12 Main St".into(),
            history: "fever and cough".into(),
            diagnosis: "Acute Bronchitis".into(),
            remarks: "Fit to work".into(),
        }
    }

    fn apply(paragraphs: &[&str], fields: &CertificateFields) -> Vec<String> {
        let mut out: Vec<String> = paragraphs.iter().map(|p| p.to_string()).collect();
        for edit in plan_fills(paragraphs, fields) {
            out[edit.index] = edit.text;
        }
        out
    }

    #[test]
    fn test_display_date_formats() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(display_date("2024-03-15", today), "March 15, 2024");
        assert_eq!(display_date("2024-03-15 09:30:00", today), "March 15, 2024");
        assert_eq!(display_date("2024-03-05T09:30", today), "March 5, 2024");
        assert_eq!(display_date("2024-12-01T08:00:00+08:00", today), "December 1, 2024");
    }

    #[test]
    fn test_display_date_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(display_date("not a date", today), "October 19, 2026");
        assert_eq!(display_date("", today), "October 19, 2026");
    }

    #[test]
    fn test_name_line() {
        assert_eq!(name_line("Jane", Some(34), Some("F")), "Jane 34/F");
        assert_eq!(name_line("Jane", None, Some("F")), "Jane /F");
        assert_eq!(name_line("Jane", Some(34), None), "Jane 34/");
        assert_eq!(name_line("Jane", None, None), "Jane");
        assert_eq!(name_line("Jane", None, Some("")), "Jane");
    }

    #[test]
    fn test_date_and_impression() {
        let out = apply(
            &["Date:____", "", "Impression:", "________", "Signature: ______"],
            &fields(),
        );
        assert_eq!(out[0], "Date:March 15, 2024");
        assert_eq!(out[3], "Acute Bronchitis");
        // Unmatched blank stays literal
        assert_eq!(out[4], "Signature: ______");
    }

    #[test]
    fn test_certify_fills_name_and_address() {
        let out = apply(&["This is to certify that ______ of ______ ____"], &fields());
        assert_eq!(out[0], "This is to certify that Jane Doe 34/F of 12 Main St ____");
    }

    #[test]
    fn test_certify_requires_blank() {
        let edits = plan_fills(&["I certify that the above is true."], &fields());
        assert!(edits.is_empty());
    }

    #[test]
    fn test_history_gets_leading_space() {
        let out = apply(&["was examined on the said date due to:____"], &fields());
        // "date" wins: rules are tried in order
        assert_eq!(out[0], "was examined on the said date due to:March 15, 2024");

        let out = apply(&["was examined and treated due to:____"], &fields());
        assert_eq!(out[0], "was examined and treated due to: fever and cough");
    }

    #[test]
    fn test_label_line_blank_left_alone() {
        let edits = plan_fills(&["Impression: ____", "________"], &fields());
        assert_eq!(
            edits,
            vec![ParagraphEdit {
                index: 1,
                text: "Acute Bronchitis".into()
            }]
        );

        // Nothing follows the label, so nothing is filled
        assert!(plan_fills(&["Remarks: ______"], &fields()).is_empty());
    }

    #[test]
    fn test_lookahead_window_limit() {
        let paragraphs = ["Remarks:", "a", "b", "c", "d", "e", "_____"];
        let edits = plan_fills(&paragraphs, &fields());
        assert!(edits.is_empty());

        let paragraphs = ["Remarks:", "a", "b", "c", "d", "_____"];
        let edits = plan_fills(&paragraphs, &fields());
        assert_eq!(
            edits,
            vec![ParagraphEdit {
                index: 5,
                text: "Fit to work".into()
            }]
        );
    }

    #[test]
    fn test_lookahead_skips_consumed() {
        // Paragraph 2 keeps a blank after the impression fill but is consumed,
        // so the remarks search moves past it.
        let paragraphs = ["Impression:", "Remarks:", "____ ____", "____"];
        let out = apply(&paragraphs, &fields());
        assert_eq!(out[2], "Acute Bronchitis ____");
        assert_eq!(out[3], "Fit to work");
    }

    #[test]
    fn test_each_paragraph_filled_once() {
        let paragraphs = ["Impression:", "______", "Remarks:", "______"];
        let edits = plan_fills(&paragraphs, &fields());
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].index, 1);
        assert_eq!(edits[0].text, "Acute Bronchitis");
        assert_eq!(edits[1].index, 3);
        assert_eq!(edits[1].text, "Fit to work");
    }

    #[test]
    fn test_case_insensitive_labels() {
        let out = apply(&["DATE: ____", "  IMPRESSION", "____"], &fields());
        assert_eq!(out[0], "DATE: March 15, 2024");
        assert_eq!(out[2], "Acute Bronchitis");
    }
}
