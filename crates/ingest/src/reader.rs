use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
    Word,
}

impl DocumentFormat {
    /// Resolve the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Word),
            _ => Err(IngestError::UnsupportedFormat(extension)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Word => "docx",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub text: String,
}

pub struct FileReader;

impl FileReader {
    pub async fn read_document(path: &Path) -> Result<Document> {
        // Format check happens before touching the file
        let format = DocumentFormat::from_path(path)?;
        info!(path = %path.display(), format = format.name(), "Loading document");

        let text = match format {
            DocumentFormat::Text => fs::read_to_string(path)
                .await
                .map_err(|source| IngestError::Read {
                    path: path.to_path_buf(),
                    source,
                })?,
            DocumentFormat::Pdf => {
                let bytes = Self::read_bytes(path).await?;
                Self::parse_pdf(path, bytes).await?
            }
            DocumentFormat::Word => {
                let bytes = Self::read_bytes(path).await?;
                Self::parse_docx(path, &bytes)?
            }
        };

        debug!(chars = text.chars().count(), "Document loaded");

        Ok(Document {
            path: path.to_path_buf(),
            format,
            text,
        })
    }

    async fn read_bytes(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn parse_pdf(path: &Path, bytes: Vec<u8>) -> Result<String> {
        // pdf-extract is CPU bound and blocking
        let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| Self::parse_error(path, DocumentFormat::Pdf, e.to_string()))?;

        let text = parsed.map_err(|e| Self::parse_error(path, DocumentFormat::Pdf, e.to_string()))?;

        let text = text.replace('\0', "");
        if text.trim().is_empty() {
            return Err(Self::parse_error(
                path,
                DocumentFormat::Pdf,
                "no text content could be extracted".to_string(),
            ));
        }

        Ok(text)
    }

    /// One line per paragraph, runs concatenated. Tables are skipped.
    fn parse_docx(path: &Path, bytes: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(bytes)
            .map_err(|e| Self::parse_error(path, DocumentFormat::Word, e.to_string()))?;

        let mut content = String::new();

        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(content)
    }

    fn parse_error(path: &Path, format: DocumentFormat, message: String) -> IngestError {
        IngestError::Parse {
            path: path.to_path_buf(),
            format: format.name(),
            message,
        }
    }
}
