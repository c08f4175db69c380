//! DOCX text extraction
//!
//! Reads `word/document.xml` out of the OOXML archive and walks the `w:t`
//! text runs. Paragraph ends become newlines so section headings in the CV
//! survive for downstream industry detection.

use crate::error::{Result, ScreenerError};
use quick_xml::events::Event;
use std::io::Read;

/// Cap on the decompressed document part, zip-bomb protection.
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ScreenerError::DocxExtraction(e.to_string()))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ScreenerError::DocxExtraction("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ScreenerError::DocxExtraction(e.to_string()))?;
    if xml.len() as u64 >= MAX_DOCUMENT_XML_BYTES {
        return Err(ScreenerError::DocxExtraction(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    collect_text_runs(&xml)
}

fn collect_text_runs(xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"br" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ScreenerError::DocxExtraction(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
