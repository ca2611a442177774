use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{EmbeddedChunk, ScoredChunk, VectorStore};

/// Brute-force cosine search over chunks held in memory. Nothing persists
/// past the process.
#[derive(Default)]
pub struct InMemoryStore {
    dimension: Mutex<Option<usize>>,
    chunks: Mutex<Vec<EmbeddedChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chunks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.lock().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut current = self.dimension.lock().await;
        match *current {
            Some(existing) if existing != dimension => {
                anyhow::bail!("Collection has dimension {}, got {}", existing, dimension)
            }
            _ => *current = Some(dimension),
        }
        Ok(())
    }

    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let dimension = *self.dimension.lock().await;
        let mut stored = self.chunks.lock().await;

        for embedded in chunks {
            if let Some(dim) = dimension {
                if embedded.embedding.len() != dim {
                    anyhow::bail!(
                        "Chunk {} has dimension {}, expected {}",
                        embedded.chunk.chunk_id,
                        embedded.embedding.len(),
                        dim
                    );
                }
            }

            match stored.iter_mut().find(|c| c.chunk.chunk_id == embedded.chunk.chunk_id) {
                Some(existing) => *existing = embedded.clone(),
                None => stored.push(embedded.clone()),
            }
        }

        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.chunks.lock().await;

        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|embedded| ScoredChunk {
                chunk_id: embedded.chunk.chunk_id.clone(),
                text: embedded.chunk.text.clone(),
                source: embedded.chunk.source.clone(),
                score: cosine_similarity(vector, &embedded.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
