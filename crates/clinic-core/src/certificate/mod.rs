//! Medical certificate generation.
//!
//! A `.docx` template is filled in from a patient and one of their visits:
//!
//! 1. Paragraph texts are extracted from `word/document.xml`
//! 2. [`plan_fills`] matches labels by keyword and picks the blanks to fill
//! 3. Each edited paragraph is rewritten as a single run in the configured font
//! 4. Trailing empty paragraphs are dropped so the certificate fits one page
//!
//! Blanks that no rule claims are left as literal underscores.

mod blanks;
mod document;
mod rules;
mod template;

pub use blanks::{fill_blanks, has_blank};
pub use document::{CertificateDocument, RunStyle, DOCUMENT_PART};
pub use rules::{display_date, name_line, plan_fills, CertificateFields, ParagraphEdit, LOOKAHEAD};
pub use template::{build_docx, CertificateTemplate};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Patient, Visit};

/// Certificate errors.
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Cannot read template {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CertificateResult<T> = Result<T, CertificateError>;

/// Fills a template for a given visit.
#[derive(Debug, Clone)]
pub struct CertificateFiller {
    template: CertificateTemplate,
    style: RunStyle,
}

impl CertificateFiller {
    pub fn new(template: CertificateTemplate, style: RunStyle) -> Self {
        Self { template, style }
    }

    /// Produce the filled `.docx` bytes, using the local date as fallback.
    pub fn fill(&self, patient: &Patient, visit: &Visit) -> CertificateResult<Vec<u8>> {
        self.fill_on(patient, visit, chrono::Local::now().date_naive())
    }

    /// Produce the filled `.docx` bytes with an explicit fallback date.
    pub fn fill_on(
        &self,
        patient: &Patient,
        visit: &Visit,
        today: NaiveDate,
    ) -> CertificateResult<Vec<u8>> {
        let fields = CertificateFields::from_visit(patient, visit, today);
        let mut document = self.template.document();

        let texts = document.paragraph_texts()?;
        let edits = plan_fills(&texts, &fields);
        for edit in &edits {
            document.set_paragraph_text(edit.index, &edit.text, &self.style)?;
        }

        let removed = document.remove_trailing_blank_paragraphs()?;
        tracing::debug!(
            patient_id = patient.id,
            visit_id = visit.id,
            filled = edits.len(),
            trailing_removed = removed,
            "certificate filled"
        );

        document.to_bytes()
    }
}
