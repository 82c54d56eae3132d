use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::extract_failed;
use crate::error::AppError;

const DOCUMENT_PART: &str = "word/document.xml";

pub(super) fn extract_docx_text(path: &Path) -> Result<String, AppError> {
    let file = File::open(path).map_err(|e| extract_failed(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| extract_failed(path, e))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| extract_failed(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| extract_failed(path, e))?;
    document_xml_to_text(&xml).map_err(|e| extract_failed(path, e))
}

/// One output line per `w:p`; text comes only from `w:t` runs.
pub(super) fn document_xml_to_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
