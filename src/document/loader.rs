use std::path::{Path, PathBuf};

use super::{Document, DocumentFormat, docx};
use crate::error::{RedlineError, Result};

/// Load a document from disk
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| RedlineError::load(path, e.to_string()))?;

    let declared = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let document = decode(path.to_path_buf(), name, &bytes, declared)?;
    log::debug!(
        "Loaded {} as {} ({} bytes, {} chars)",
        path.display(),
        document.format,
        bytes.len(),
        document.text.len()
    );
    Ok(document)
}

/// Load a document already held in memory. The format is sniffed when not given.
pub fn load_bytes(name: impl Into<String>, bytes: &[u8], format: Option<DocumentFormat>) -> Result<Document> {
    let name = name.into();
    decode(PathBuf::from(&name), name, bytes, format)
}

fn decode(path: PathBuf, name: String, bytes: &[u8], declared: Option<DocumentFormat>) -> Result<Document> {
    let format = declared
        .or_else(|| DocumentFormat::sniff(bytes))
        .ok_or_else(|| RedlineError::load(&path, "unsupported document format"))?;

    let text = match format {
        DocumentFormat::Txt => plain_text(bytes),
        DocumentFormat::Docx => docx::extract_text(bytes),
        DocumentFormat::Pdf => pdf_text(bytes),
    }
    .map_err(|reason| RedlineError::load(&path, reason))?;

    let text = text.replace("\r\n", "\n");
    if text.trim().is_empty() {
        return Err(RedlineError::load(&path, format!("no extractable text in {} document", format)));
    }

    Ok(Document { name, format, text })
}

fn plain_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("text file is not valid UTF-8: {}", e))
}

fn pdf_text(bytes: &[u8]) -> std::result::Result<String, String> {
    // pdf-extract panics on some malformed inputs
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("failed to extract PDF text: {}", e)),
        Err(_) => Err("failed to extract PDF text: malformed document".to_string()),
    }
}
