//! DOCX text extraction from `word/document.xml`

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the body text of a DOCX archive: one line per paragraph, with
/// tabs and manual breaks kept.
pub fn extract_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a valid DOCX archive: {}", e))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| format!("missing {}: {}", DOCUMENT_PART, e))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format!("failed to read {}: {}", DOCUMENT_PART, e))?;

    paragraphs_from_xml(&xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| format!("malformed text in {}: {}", DOCUMENT_PART, e))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML in {} at position {}: {}",
                    DOCUMENT_PART,
                    reader.buffer_position(),
                    e
                ));
            }
        }
    }

    Ok(out)
}
