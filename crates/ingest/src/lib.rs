pub mod chunk;
pub mod chunker;
pub mod error;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use error::{IngestError, Result};
pub use reader::{Document, DocumentFormat, FileReader};

use sha2::{Digest, Sha256};
use std::path::Path;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Load a document and split it into chunks.
///
/// The chunking configuration is validated before the file is read, and an
/// unsupported extension fails before any I/O.
pub async fn ingest_file(file_path: &Path, config: &ChunkerConfig) -> Result<(Document, Vec<Chunk>)> {
    let chunker = Chunker::new(*config)?;
    let document = FileReader::read_document(file_path).await?;

    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);
    let chunks = chunker.chunk_text(&doc_id, &document.text, &path_str);

    Ok((document, chunks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srs.txt");
        let body = "Functional requirement. ".repeat(60);
        std::fs::write(&path, &body).unwrap();

        let (document, chunks) = ingest_file(&path, &ChunkerConfig::default()).await.unwrap();

        assert_eq!(document.format, DocumentFormat::Text);
        assert!(chunks.len() > 1);
        let doc_id = generate_doc_id(&path.to_string_lossy());
        assert!(chunks.iter().all(|c| c.doc_id == doc_id));
        assert!(chunks.iter().all(|c| c.char_len() <= 500));
    }

    #[tokio::test]
    async fn test_ingest_rejects_unknown_format() {
        let err = ingest_file(Path::new("spec.odt"), &ChunkerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_doc_id_stable() {
        assert_eq!(generate_doc_id("a/b.txt"), generate_doc_id("a/b.txt"));
        assert_ne!(generate_doc_id("a/b.txt"), generate_doc_id("a/c.txt"));
    }
}
