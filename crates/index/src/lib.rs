pub mod embeddings;
pub mod memory;
pub mod qdrant_index;

pub use embeddings::{Embedder, EmbeddingClient};
pub use memory::InMemoryStore;
pub use qdrant_index::QdrantStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Chunks are sent to the store in batches of this size.
const UPSERT_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: ingest::Chunk,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Persists embedded chunks and answers similarity queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Insert or overwrite chunks, keyed by chunk ID.
    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()>;

    /// Top `top_k` chunks by similarity, best first.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Embeds chunks and writes them to a vector store.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embed every chunk in order and upsert them. The collection is created
    /// from the first embedding's dimension.
    pub async fn index_chunks(&self, chunks: &[ingest::Chunk]) -> Result<IndexStats> {
        if chunks.is_empty() {
            warn!("No chunks to index");
            return Ok(IndexStats::default());
        }

        let mut batch = Vec::with_capacity(UPSERT_BATCH);
        let mut stats = IndexStats::default();

        for chunk in chunks {
            let embedding = self.embedder
                .embed(&chunk.text)
                .await
                .with_context(|| format!("Failed to generate embedding for chunk {}", chunk.chunk_id))?;

            if stats.dimension == 0 {
                stats.dimension = embedding.len();
                self.store.ensure_collection(stats.dimension).await?;
            }

            batch.push(EmbeddedChunk {
                chunk: chunk.clone(),
                embedding,
            });

            if batch.len() == UPSERT_BATCH {
                self.store.upsert(&batch).await?;
                stats.chunks_indexed += batch.len();
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.store.upsert(&batch).await?;
            stats.chunks_indexed += batch.len();
        }

        info!(chunks = stats.chunks_indexed, dimension = stats.dimension, "Vector store updated");
        Ok(stats)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub chunks_indexed: usize,
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Letter-frequency embedding over a few letters; enough to rank texts.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(['a', 'e', 'l', 'p', 'u']
                .iter()
                .map(|c| text.chars().filter(|t| t == c).count() as f32)
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("connection refused")
        }
    }

    fn chunks(n: usize) -> Vec<ingest::Chunk> {
        (0..n)
            .map(|i| {
                let text = format!("chunk number {i} about apples");
                ingest::Chunk::new("doc".into(), text.clone(), "srs.txt".into(), (i, i + text.len()))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_index_chunks_in_batches() {
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(Arc::new(LetterEmbedder), store.clone());

        let stats = indexer.index_chunks(&chunks(UPSERT_BATCH + 3)).await.unwrap();

        assert_eq!(stats.chunks_indexed, UPSERT_BATCH + 3);
        assert_eq!(stats.dimension, 5);
        assert_eq!(store.len().await, UPSERT_BATCH + 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(Arc::new(LetterEmbedder), store.clone());

        assert_eq!(indexer.index_chunks(&[]).await.unwrap(), IndexStats::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(Arc::new(FailingEmbedder), store.clone());

        let err = indexer.index_chunks(&chunks(2)).await.unwrap_err();
        assert!(format!("{err:#}").contains("connection refused"));
        assert!(store.is_empty().await);
    }
}
