// Document Reader
// Plain text, PDF and DOCX sources into normalized text

use crate::services::text_processor::normalize_punctuation;
use docx_rs::{DocumentChild, ParagraphChild, Run, RunChild};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid UTF-8 text: {0}")]
    InvalidEncoding(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("document contains no text: {0}")]
    Empty(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            _ => Self::PlainText,
        }
    }
}

/// Read a document from disk and return its normalized text.
pub fn read_document(path: &Path) -> Result<String, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input.txt".to_string());

    extract_text(&file_name, &bytes)
}

/// Extract normalized text from in-memory file contents; the kind follows the file name.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, InputError> {
    let kind = DocumentKind::from_file_name(file_name);
    let raw = match kind {
        DocumentKind::PlainText => {
            let s = std::str::from_utf8(bytes)
                .map_err(|_| InputError::InvalidEncoding(file_name.to_string()))?;
            s.trim_start_matches('\u{feff}').to_string()
        }
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| InputError::Pdf(e.to_string()))?,
        DocumentKind::Docx => extract_docx_text(bytes)?,
    };

    let text = normalize_punctuation(&raw);
    if text.is_empty() {
        return Err(InputError::Empty(file_name.to_string()));
    }

    info!(
        file = file_name,
        kind = ?kind,
        chars = text.chars().count(),
        "document.extracted"
    );
    Ok(text)
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, InputError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| InputError::Docx(e.to_string()))?;

    // One paragraph per block, separated by blank lines.
    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(&p.children)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n\n"))
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, &mut out),
            ParagraphChild::Hyperlink(link) => out.push_str(&paragraph_text(&link.children)),
            _ => {}
        }
    }
    out
}

fn push_run_text(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push(' '),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(DocumentKind::from_file_name("a.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("essay.docx"), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_file_name("notes"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_file_name("notes.md"), DocumentKind::PlainText);
    }

    #[test]
    fn test_read_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay.txt");
        std::fs::write(&path, "\u{feff}The sky is blue.\r\nWater boils.  ").unwrap();
        assert_eq!(read_document(&path).unwrap(), "The sky is blue.\nWater boils.");
    }

    #[test]
    fn test_missing_file() {
        let err = read_document(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "  \n\t").unwrap();
        assert!(matches!(read_document(&path), Err(InputError::Empty(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = extract_text("bin.txt", &[0xff, 0xfe, 0x00, 0xd8]).unwrap_err();
        assert!(matches!(err, InputError::InvalidEncoding(_)));
    }

    #[test]
    fn test_docx_extraction() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buf = Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("The sky is blue.")))
            .add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text("Fish & chips")
                        .add_tab()
                        .add_text("taste good."),
                ),
            )
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = extract_text("essay.docx", &buf.into_inner()).unwrap();
        assert_eq!(text, "The sky is blue.\n\nFish & chips taste good.");
    }

    #[test]
    fn test_corrupt_docx() {
        let err = extract_text("broken.docx", b"not a zip").unwrap_err();
        assert!(matches!(err, InputError::Docx(_)));
    }
}
