//! Minimal WordprocessingML (`.docx`) document model.
//!
//! Only `word/document.xml` is interpreted; every other package part is
//! carried through untouched. The body is kept as a stream of XML events in
//! which each top-level `<w:p>` is grouped into a [`Paragraph`].

use std::io::{Cursor, Read, Write};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{CertificateError, CertificateResult};

/// Package part holding the main document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

const W_BODY: &[u8] = b"w:body";
const W_P: &[u8] = b"w:p";
const W_PPR: &[u8] = b"w:pPr";
const W_T: &[u8] = b"w:t";
const W_TAB: &[u8] = b"w:tab";

/// Font applied to rewritten paragraphs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font_family: String,
    pub font_size_pt: f32,
}

impl Default for RunStyle {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size_pt: 12.0,
        }
    }
}

impl RunStyle {
    /// Size in half-points, as WordprocessingML stores it.
    fn half_points(&self) -> String {
        ((self.font_size_pt * 2.0).round() as u32).to_string()
    }
}

#[derive(Debug, Clone)]
struct PackagePart {
    name: String,
    data: Vec<u8>,
}

/// A body-level paragraph as raw events, including its own start/end tags.
#[derive(Debug, Clone)]
struct Paragraph {
    events: Vec<Event<'static>>,
}

#[derive(Debug, Clone)]
enum Node {
    Raw(Event<'static>),
    Paragraph(Paragraph),
}

/// An editable `.docx` document.
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    parts: Vec<PackagePart>,
    body: Vec<Node>,
}

impl CertificateDocument {
    /// Parse a `.docx` package.
    pub fn from_bytes(bytes: &[u8]) -> CertificateResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut document_xml = None;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            if name == DOCUMENT_PART {
                document_xml = Some(String::from_utf8(data.clone()).map_err(|e| {
                    CertificateError::Malformed(format!("{} is not UTF-8: {}", DOCUMENT_PART, e))
                })?);
            }
            parts.push(PackagePart { name, data });
        }

        let document_xml = document_xml.ok_or_else(|| {
            CertificateError::Malformed(format!("missing {}", DOCUMENT_PART))
        })?;

        Ok(Self {
            parts,
            body: parse_body(&document_xml)?,
        })
    }

    /// Plain text of every body-level paragraph, in document order.
    pub fn paragraph_texts(&self) -> CertificateResult<Vec<String>> {
        self.paragraphs().map(paragraph_text).collect()
    }

    /// Replace a paragraph's runs with a single run of `text`.
    ///
    /// Paragraph properties are kept; run-level formatting is replaced by
    /// `style`.
    pub fn set_paragraph_text(
        &mut self,
        index: usize,
        text: &str,
        style: &RunStyle,
    ) -> CertificateResult<()> {
        let paragraph = self
            .body
            .iter_mut()
            .filter_map(|node| match node {
                Node::Paragraph(p) => Some(p),
                Node::Raw(_) => None,
            })
            .nth(index)
            .ok_or_else(|| {
                CertificateError::Malformed(format!("paragraph {} out of range", index))
            })?;

        paragraph.events = rewrite_paragraph(&paragraph.events, text, style)?;
        Ok(())
    }

    /// Drop blank paragraphs from the end of the body.
    ///
    /// Returns how many were removed.
    pub fn remove_trailing_blank_paragraphs(&mut self) -> CertificateResult<usize> {
        let mut removed = 0;

        loop {
            let last = self
                .body
                .iter()
                .rposition(|node| matches!(node, Node::Paragraph(_)));
            let Some(position) = last else { break };

            let Node::Paragraph(paragraph) = &self.body[position] else {
                break;
            };
            if !paragraph_text(paragraph)?.trim().is_empty() {
                break;
            }

            self.body.remove(position);
            removed += 1;
        }

        Ok(removed)
    }

    /// Serialize back into a `.docx` package.
    pub fn to_bytes(&self) -> CertificateResult<Vec<u8>> {
        let document_xml = write_body(&self.body)?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for part in &self.parts {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(part.name.as_str(), options)?;
            if part.name == DOCUMENT_PART {
                writer.write_all(&document_xml)?;
            } else {
                writer.write_all(&part.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|node| match node {
            Node::Paragraph(p) => Some(p),
            Node::Raw(_) => None,
        })
    }
}

fn xml_error(e: impl std::fmt::Display) -> CertificateError {
    CertificateError::Xml(e.to_string())
}

/// Group the event stream, collecting top-level paragraphs of `<w:body>`.
fn parse_body(xml: &str) -> CertificateResult<Vec<Node>> {
    let mut reader = Reader::from_str(xml);
    let mut nodes = Vec::new();

    // Open elements before the current event
    let mut depth = 0usize;
    // Depth at which children of <w:body> start
    let mut body_child_depth: Option<usize> = None;
    // Events of the paragraph being collected, and the depth it opened at
    let mut current: Option<(usize, Vec<Event<'static>>)> = None;

    loop {
        let event = reader.read_event().map_err(xml_error)?.into_owned();

        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                if let Some((_, events)) = current.as_mut() {
                    events.push(event.clone());
                } else if body_child_depth == Some(depth) && e.name().as_ref() == W_P {
                    current = Some((depth, vec![event.clone()]));
                } else {
                    if e.name().as_ref() == W_BODY {
                        body_child_depth = Some(depth + 1);
                    }
                    nodes.push(Node::Raw(event.clone()));
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| xml_error("unbalanced end tag"))?;

                match current.take() {
                    Some((open_depth, mut events)) => {
                        events.push(event);
                        if open_depth == depth {
                            nodes.push(Node::Paragraph(Paragraph { events }));
                        } else {
                            current = Some((open_depth, events));
                        }
                    }
                    None => nodes.push(Node::Raw(event)),
                }
            }
            Event::Empty(ref e) => {
                if let Some((_, events)) = current.as_mut() {
                    events.push(event.clone());
                } else if body_child_depth == Some(depth) && e.name().as_ref() == W_P {
                    nodes.push(Node::Paragraph(Paragraph {
                        events: vec![event.clone()],
                    }));
                } else {
                    nodes.push(Node::Raw(event.clone()));
                }
            }
            other => match current.as_mut() {
                Some((_, events)) => events.push(other),
                None => nodes.push(Node::Raw(other)),
            },
        }
    }

    if current.is_some() {
        return Err(xml_error("unterminated paragraph"));
    }

    Ok(nodes)
}

fn write_body(nodes: &[Node]) -> CertificateResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    for node in nodes {
        match node {
            Node::Raw(event) => writer.write_event(event.borrow()).map_err(xml_error)?,
            Node::Paragraph(paragraph) => {
                for event in &paragraph.events {
                    writer.write_event(event.borrow()).map_err(xml_error)?;
                }
            }
        }
    }

    Ok(writer.into_inner())
}

/// Concatenated `<w:t>` text of a paragraph, tabs included.
fn paragraph_text(paragraph: &Paragraph) -> CertificateResult<String> {
    let mut text = String::new();
    let mut in_text = false;

    for event in &paragraph.events {
        match event {
            Event::Start(e) if e.name().as_ref() == W_T => in_text = true,
            Event::End(e) if e.name().as_ref() == W_T => in_text = false,
            Event::Empty(e) if e.name().as_ref() == W_TAB => text.push('\t'),
            Event::Text(t) if in_text => text.push_str(&t.decode().map_err(xml_error)?),
            Event::CData(t) if in_text => {
                text.push_str(&String::from_utf8_lossy(t));
            }
            Event::GeneralRef(r) if in_text => text.push_str(&resolve_reference(r)?),
            _ => {}
        }
    }

    Ok(text)
}

/// Resolve `&name;` and `&#NN;` / `&#xNN;` references.
fn resolve_reference(reference: &BytesRef<'_>) -> CertificateResult<String> {
    let name = reference.decode().map_err(xml_error)?;

    let resolved = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
    } else {
        resolve_predefined_entity(&name).map(str::to_string)
    };

    resolved.ok_or_else(|| xml_error(format!("unknown entity &{};", name)))
}

/// Build the events of a paragraph holding one styled run.
fn rewrite_paragraph(
    events: &[Event<'static>],
    text: &str,
    style: &RunStyle,
) -> CertificateResult<Vec<Event<'static>>> {
    let (open, properties) = match events.first() {
        Some(Event::Start(start)) => (start.clone(), paragraph_properties(events)),
        Some(Event::Empty(start)) => (start.clone(), Vec::new()),
        _ => return Err(xml_error("paragraph does not start with <w:p>")),
    };

    let half_points = style.half_points();
    let font = style.font_family.as_str();

    let mut out = Vec::with_capacity(properties.len() + 12);
    out.push(Event::Start(open));
    out.extend(properties);
    out.push(Event::Start(BytesStart::new("w:r")));
    out.push(Event::Start(BytesStart::new("w:rPr")));
    out.push(Event::Empty(BytesStart::new("w:rFonts").with_attributes([
        ("w:ascii", font),
        ("w:hAnsi", font),
        ("w:cs", font),
        ("w:eastAsia", font),
    ])));
    out.push(Event::Empty(
        BytesStart::new("w:sz").with_attributes([("w:val", half_points.as_str())]),
    ));
    out.push(Event::Empty(
        BytesStart::new("w:szCs").with_attributes([("w:val", half_points.as_str())]),
    ));
    out.push(Event::End(BytesEnd::new("w:rPr")));
    out.push(Event::Start(
        BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
    ));
    out.push(Event::Text(BytesText::new(text)));
    out.push(Event::End(BytesEnd::new("w:t")));
    out.push(Event::End(BytesEnd::new("w:r")));
    out.push(Event::End(BytesEnd::new("w:p")));

    Ok(out.into_iter().map(Event::into_owned).collect())
}

/// The paragraph's direct `<w:pPr>` element, if any.
fn paragraph_properties(events: &[Event<'static>]) -> Vec<Event<'static>> {
    let mut depth = 0usize;
    let mut collecting = false;
    let mut out = Vec::new();

    // Skip the opening <w:p>
    for event in events.iter().skip(1) {
        match event {
            Event::Start(e) => {
                if depth == 0 && e.name().as_ref() == W_PPR {
                    collecting = true;
                }
                if collecting {
                    out.push(event.clone());
                }
                depth += 1;
            }
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if collecting {
                    out.push(event.clone());
                    if depth == 0 {
                        break;
                    }
                }
            }
            Event::Empty(e) if depth == 0 && e.name().as_ref() == W_PPR => {
                out.push(event.clone());
                break;
            }
            _ if collecting => out.push(event.clone()),
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::template::build_docx;

    fn doc_from_body(body: &str) -> CertificateDocument {
        let bytes = build_docx(body).unwrap();
        CertificateDocument::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_paragraph_texts_join_runs() {
        let doc = doc_from_body(
            r#"<w:p><w:r><w:t>Date: </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>____</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Tom &amp; Jerry&#x21;</w:t></w:r></w:p>"#,
        );

        let texts = doc.paragraph_texts().unwrap();
        assert_eq!(texts, vec!["Date: ____", "", "Tom & Jerry!"]);
    }

    #[test]
    fn test_table_paragraphs_not_counted() {
        let doc = doc_from_body(
            r#"<w:p><w:r><w:t>Top</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell ____</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Bottom</w:t></w:r></w:p>"#,
        );

        assert_eq!(doc.paragraph_texts().unwrap(), vec!["Top", "Bottom"]);
    }

    #[test]
    fn test_set_text_keeps_paragraph_properties() {
        let mut doc = doc_from_body(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>Date: </w:t></w:r><w:r><w:t>___</w:t></w:r></w:p>"#,
        );

        doc.set_paragraph_text(0, "Date: March 15, 2024 <ok>", &RunStyle::default())
            .unwrap();

        let bytes = doc.to_bytes().unwrap();
        let reread = CertificateDocument::from_bytes(&bytes).unwrap();
        assert_eq!(
            reread.paragraph_texts().unwrap(),
            vec!["Date: March 15, 2024 <ok>"]
        );

        let xml = reread.document_xml_for_test();
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
        assert!(xml.contains(r#"w:ascii="Times New Roman""#));
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
        assert!(!xml.contains("<w:i/>"));
        assert!(xml.contains("&lt;ok&gt;"));
    }

    #[test]
    fn test_set_text_on_empty_paragraph() {
        let mut doc = doc_from_body("<w:p/>");
        doc.set_paragraph_text(0, "filled", &RunStyle::default())
            .unwrap();
        assert_eq!(doc.paragraph_texts().unwrap(), vec!["filled"]);
    }

    #[test]
    fn test_set_text_out_of_range() {
        let mut doc = doc_from_body("<w:p/>");
        assert!(doc
            .set_paragraph_text(3, "x", &RunStyle::default())
            .is_err());
    }

    #[test]
    fn test_remove_trailing_blank_paragraphs() {
        let mut doc = doc_from_body(
            r#"<w:p><w:r><w:t>Keep</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Also keep</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t xml:space="preserve">   </w:t></w:r></w:p>
<w:p></w:p>"#,
        );

        assert_eq!(doc.remove_trailing_blank_paragraphs().unwrap(), 3);
        assert_eq!(
            doc.paragraph_texts().unwrap(),
            vec!["Keep", "", "Also keep"]
        );
    }

    #[test]
    fn test_other_parts_carried_through() {
        let doc = doc_from_body("<w:p/>");
        let bytes = doc.to_bytes().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "word/document.xml"]
        );
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(
            CertificateDocument::from_bytes(&bytes),
            Err(CertificateError::Malformed(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            CertificateDocument::from_bytes(b"plain text"),
            Err(CertificateError::Zip(_))
        ));
    }

    impl CertificateDocument {
        fn document_xml_for_test(&self) -> String {
            String::from_utf8(write_body(&self.body).unwrap()).unwrap()
        }
    }
}
