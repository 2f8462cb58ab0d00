//! Export formats, artifact naming and the print-format converter.

pub mod print;

use crate::constants::DEFAULT_EXPORT_STEM;
use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Leading bytes of a ZIP local file header; DOCX is a ZIP container.
pub const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Html => "html",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "DOCX",
            ExportFormat::Html => "HTML",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(ExportError::InvalidOptions(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// Replace path-reserved characters; blank results fall back to `document`.
pub fn sanitize_file_stem(value: &str) -> String {
    let out: String = value
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            ch if ch.is_control() => '_',
            _ => ch,
        })
        .collect();
    let out = out.trim().trim_end_matches('.').trim_end();
    if out.is_empty() {
        DEFAULT_EXPORT_STEM.to_string()
    } else {
        out.to_string()
    }
}

/// `<title>.<ext>` for the current document title.
pub fn artifact_file_name(title: &str, format: ExportFormat) -> String {
    format!("{}.{}", sanitize_file_stem(title), format.extension())
}

/// Reject server-rendered DOCX payloads that are not ZIP containers.
pub fn verify_docx(bytes: &[u8]) -> Result<(), ExportError> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        Ok(())
    } else {
        Err(ExportError::InvalidArtifact(format!(
            "expected a DOCX (zip) payload, got {} bytes without a zip header",
            bytes.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_title_with_fallback() {
        assert_eq!(artifact_file_name("Plan", ExportFormat::Pdf), "Plan.pdf");
        assert_eq!(
            artifact_file_name("Q3: a/b?", ExportFormat::Docx),
            "Q3_ a_b_.docx"
        );
        assert_eq!(artifact_file_name("   ", ExportFormat::Html), "document.html");
        assert_eq!(artifact_file_name("", ExportFormat::Docx), "document.docx");
        assert_eq!(sanitize_file_stem("notes..."), "notes");
        assert_eq!(sanitize_file_stem("bad<>:\"/\\|?*name"), "bad_________name");
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("PDF".parse::<ExportFormat>().ok(), Some(ExportFormat::Pdf));
        assert_eq!(" docx ".parse::<ExportFormat>().ok(), Some(ExportFormat::Docx));
        assert!(matches!(
            "odt".parse::<ExportFormat>(),
            Err(ExportError::InvalidOptions(_))
        ));
    }

    #[test]
    fn docx_payload_must_be_zip() {
        assert!(verify_docx(b"PK\x03\x04rest").is_ok());
        assert!(matches!(
            verify_docx(b"<html>error</html>"),
            Err(ExportError::InvalidArtifact(_))
        ));
        assert!(verify_docx(b"").is_err());
    }
}
