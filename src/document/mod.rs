//! Document Loader - turns PDF, DOCX and plain-text inputs into text
//!
//! Format is taken from the file extension when it is one we know, otherwise
//! sniffed from the leading bytes. Documents never carry empty text.

mod docx;
mod loader;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use loader::{load_bytes, load_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" | "text" | "md" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }

    /// Guess the format from content: PDF and ZIP magic, else UTF-8 text
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(DocumentFormat::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(DocumentFormat::Docx)
        } else if std::str::from_utf8(bytes).is_ok() {
            Some(DocumentFormat::Txt)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Txt => "TXT",
        };
        f.write_str(name)
    }
}

/// A loaded input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Display name, usually the file name
    pub name: String,
    pub format: DocumentFormat,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, format: DocumentFormat, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format,
            text: text.into(),
        }
    }
}
