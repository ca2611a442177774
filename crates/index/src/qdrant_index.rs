use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{EmbeddedChunk, ScoredChunk, VectorStore};

/// Vector store backed by Qdrant's REST API.
pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
    collection_name: String,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: Vec<Point<'a>>,
}

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: &'a [f32],
    payload: Payload,
}

#[derive(Serialize, Deserialize, Default)]
struct Payload {
    #[serde(default)]
    chunk_id: String,
    #[serde(default)]
    doc_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

impl QdrantStore {
    pub fn new(base_url: String, collection_name: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            collection_name,
        }
    }

    async fn collection_exists(&self) -> Result<bool> {
        let url = format!("{}/collections", self.base_url);
        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to reach Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list collections: {}", response.status());
        }

        let info: CollectionInfo = response
            .json()
            .await
            .context("Failed to parse Qdrant collection list")?;

        Ok(info.result.collections.iter().any(|c| c.name == self.collection_name))
    }
}

/// Qdrant point IDs must be integers or UUIDs; derive a UUID from the chunk ID
/// so re-ingesting a document overwrites its points.
fn point_id(chunk_id: &str) -> String {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        if self.collection_exists().await? {
            info!(collection = %self.collection_name, "Collection already exists");
            return Ok(());
        }

        info!(collection = %self.collection_name, dimension, "Creating collection");

        let url = format!("{}/collections/{}", self.base_url, self.collection_name);
        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client
            .put(&url)
            .json(&create_req)
            .send()
            .await
            .context("Failed to send create collection request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        Ok(())
    }

    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .map(|embedded| Point {
                id: point_id(&embedded.chunk.chunk_id),
                vector: &embedded.embedding,
                payload: Payload {
                    chunk_id: embedded.chunk.chunk_id.clone(),
                    doc_id: embedded.chunk.doc_id.clone(),
                    text: embedded.chunk.text.clone(),
                    source: embedded.chunk.source.clone(),
                },
            })
            .collect();

        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection_name
        );

        let response = self.client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await
            .context("Failed to send upsert request to Qdrant")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to upsert points: {}", error_text);
        }

        debug!(count = chunks.len(), "Upserted points");
        Ok(())
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection_name
        );

        let body = SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
        };

        let response = self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send search request to Qdrant")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Qdrant search failed: {}", error_text);
        }

        let result: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant response")?;

        Ok(hits_to_chunks(result))
    }
}

fn hits_to_chunks(response: SearchResponse) -> Vec<ScoredChunk> {
    response
        .result
        .into_iter()
        .filter_map(|hit| {
            let payload = hit.payload.unwrap_or_default();
            if payload.text.is_empty() {
                return None;
            }
            Some(ScoredChunk {
                chunk_id: payload.chunk_id,
                text: payload.text,
                source: payload.source,
                score: hit.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = point_id("5f1c0d6e2b7a4c3d9e8f7a6b5c4d3e2f");
        let b = point_id("5f1c0d6e2b7a4c3d9e8f7a6b5c4d3e2f");
        assert_eq!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_ne!(a, point_id("another chunk"));
    }

    #[test]
    fn test_search_request_shape() {
        let vector = [0.5f32, 0.25];
        let body = SearchRequest {
            vector: &vector,
            limit: 5,
            with_payload: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"vector": [0.5, 0.25], "limit": 5, "with_payload": true})
        );
    }

    #[test]
    fn test_search_response_parsing() {
        let raw = r#"{
            "result": [
                {"id": "a", "version": 1, "score": 0.91,
                 "payload": {"chunk_id": "c1", "doc_id": "d", "text": "Users can log in.", "source": "srs.txt"}},
                {"id": "b", "version": 1, "score": 0.42, "payload": {"chunk_id": "c2"}},
                {"id": "c", "version": 1, "score": 0.40}
            ],
            "status": "ok",
            "time": 0.001
        }"#;

        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let chunks = hits_to_chunks(response);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "c1");
        assert_eq!(chunks[0].text, "Users can log in.");
        assert!((chunks[0].score - 0.91).abs() < f32::EPSILON);
    }

    #[test]
    fn test_collection_list_parsing() {
        let raw = r#"{"result": {"collections": [{"name": "srs_documents"}]}, "status": "ok", "time": 0.0}"#;
        let info: CollectionInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.result.collections[0].name, "srs_documents");
    }
}
