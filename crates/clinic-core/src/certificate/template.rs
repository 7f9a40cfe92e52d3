//! Certificate templates: loading from disk or generating the built-in one.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::document::{CertificateDocument, DOCUMENT_PART};
use super::{CertificateError, CertificateResult};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const SECTION_PROPERTIES: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

/// Body of the built-in medical certificate.
const BUILTIN_BODY: &str = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t>MEDICAL CERTIFICATE</w:t></w:r></w:p>
<w:p/>
<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t xml:space="preserve">Date: </w:t></w:r><w:r><w:t>________________________</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>TO WHOM IT MAY CONCERN:</w:t></w:r></w:p>
<w:p/>
<w:p><w:pPr><w:ind w:firstLine="720"/><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">This is to certify that </w:t></w:r><w:r><w:t>______________________________</w:t></w:r><w:r><w:t xml:space="preserve"> of </w:t></w:r><w:r><w:t>______________________________</w:t></w:r></w:p>
<w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">was examined and treated at this clinic due to</w:t></w:r><w:r><w:t>____________________________________</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Impression:</w:t></w:r></w:p>
<w:p><w:pPr><w:ind w:left="720"/></w:pPr><w:r><w:t>__________________________________________________</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Remarks:</w:t></w:r></w:p>
<w:p><w:pPr><w:ind w:left="720"/></w:pPr><w:r><w:t>__________________________________________________</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>This certification is issued upon the request of the patient for whatever purpose it may serve.</w:t></w:r></w:p>
<w:p/>
<w:p/>
<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t>______________________________</w:t></w:r></w:p>
<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t>Attending Physician</w:t></w:r></w:p>
<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t xml:space="preserve">License No. </w:t></w:r><w:r><w:t>____________</w:t></w:r></w:p>
<w:p/>
<w:p/>"#;

/// Wrap body XML into a minimal `.docx` package.
pub fn build_docx(body_xml: &str) -> CertificateResult<Vec<u8>> {
    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}{}</w:body></w:document>"
        ),
        body_xml, SECTION_PROPERTIES
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        (DOCUMENT_PART, document.as_str()),
    ] {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(name, options)?;
        writer.write_all(contents.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// A parsed certificate template, ready to be filled many times.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    document: CertificateDocument,
}

impl CertificateTemplate {
    /// Load a `.docx` template from disk.
    pub fn load(path: impl AsRef<Path>) -> CertificateResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| CertificateError::Template {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a template from `.docx` bytes.
    pub fn from_bytes(bytes: &[u8]) -> CertificateResult<Self> {
        Ok(Self {
            document: CertificateDocument::from_bytes(bytes)?,
        })
    }

    /// The standard certificate layout shipped with the crate.
    pub fn builtin() -> CertificateResult<Self> {
        Self::from_bytes(&build_docx(BUILTIN_BODY)?)
    }

    /// A fresh copy of the template document.
    pub fn document(&self) -> CertificateDocument {
        self.document.clone()
    }
}
