//! Vector store abstraction
//!
//! Chunk embeddings are persisted with their owner and queried by cosine
//! distance, always scoped to a single owner. The Postgres repository
//! implements this over pgvector; [`MemoryVectorStore`] provides exact cosine
//! math for worker tests.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Default number of nearest chunks to retrieve
pub const DEFAULT_TOP_K: usize = 6;

/// Minimum chunk length worth embedding; shorter fragments are noise
pub const MIN_CHUNK_CHARS: usize = 20;

/// A chunk ready for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub resume_id: Uuid,
    pub owner_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
    pub source_type: String,
}

/// A chunk returned from a nearest-neighbor query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub resume_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub source_type: String,
    /// Cosine distance to the query vector; lower is closer
    pub distance: f64,
}

/// Storage for chunk embeddings with owner-scoped similarity queries
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert one chunk. Chunks are immutable once written.
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid>;

    /// Return up to `k` chunks belonging to `owner_id`, ordered by ascending
    /// cosine distance to `query`. Ties break by insertion order.
    async fn nearest(
        &self,
        query: &[f32],
        owner_id: Uuid,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Cosine distance between two vectors: 1 - cos(theta)
///
/// Zero-magnitude vectors are treated as maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// In-memory vector store with exact cosine distance
///
/// Used by pipeline tests; preserves insertion order for tie-breaking the
/// same way the pgvector query does.
#[derive(Default)]
pub struct MemoryVectorStore {
    chunks: Mutex<Vec<(Uuid, NewChunk)>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently stored
    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of stored chunks for a resume, in insertion order
    pub fn chunks_for_resume(&self, resume_id: Uuid) -> Vec<NewChunk> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| c.resume_id == resume_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Remove all chunks belonging to a resume
    pub fn delete_for_resume(&self, resume_id: Uuid) {
        self.chunks
            .lock()
            .unwrap()
            .retain(|(_, c)| c.resume_id != resume_id);
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid> {
        if chunk.content.chars().count() < MIN_CHUNK_CHARS {
            return Err(AppError::Validation {
                message: format!(
                    "chunk below minimum length of {} chars",
                    MIN_CHUNK_CHARS
                ),
                field: Some("content".into()),
            });
        }
        let id = Uuid::new_v4();
        self.chunks.lock().unwrap().push((id, chunk));
        Ok(id)
    }

    async fn nearest(
        &self,
        query: &[f32],
        owner_id: Uuid,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.chunks.lock().unwrap();
        let mut scored: Vec<RetrievedChunk> = chunks
            .iter()
            .filter(|(_, c)| c.owner_id == owner_id)
            .map(|(id, c)| RetrievedChunk {
                chunk_id: *id,
                resume_id: c.resume_id,
                chunk_index: c.chunk_index,
                content: c.content.clone(),
                source_type: c.source_type.clone(),
                distance: cosine_distance(query, &c.embedding),
            })
            .collect();

        // Stable sort keeps insertion order for equal distances
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(owner: Uuid, resume: Uuid, index: i32, text: &str, v: Vec<f32>) -> NewChunk {
        NewChunk {
            resume_id: resume,
            owner_id: owner,
            chunk_index: index,
            content: text.to_string(),
            embedding: v,
            embedding_model: "mock-embedding".to_string(),
            source_type: "resume".to_string(),
        }
    }

    #[test]
    fn test_cosine_distance_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(cosine_distance(&v, &v).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn test_nearest_is_owner_scoped() {
        let store = MemoryVectorStore::new();
        let owner_a = Uuid::new_v4();
        let owner_b = Uuid::new_v4();
        let resume_a = Uuid::new_v4();
        let resume_b = Uuid::new_v4();

        store
            .insert(chunk(owner_a, resume_a, 0, "owner A built a search engine", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(chunk(owner_b, resume_b, 0, "owner B built a search engine", vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = store.nearest(&[1.0, 0.0], owner_a, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].resume_id, resume_a);
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance_then_insertion() {
        let store = MemoryVectorStore::new();
        let owner = Uuid::new_v4();
        let resume = Uuid::new_v4();

        let first = store
            .insert(chunk(owner, resume, 0, "first chunk with equal distance", vec![0.0, 1.0]))
            .await
            .unwrap();
        let second = store
            .insert(chunk(owner, resume, 1, "second chunk with equal distance", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .insert(chunk(owner, resume, 2, "closest chunk wins outright here", vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = store.nearest(&[1.0, 0.0], owner, 3).await.unwrap();
        assert_eq!(hits[0].chunk_index, 2);
        assert_eq!(hits[1].chunk_id, first);
        assert_eq!(hits[2].chunk_id, second);
    }

    #[tokio::test]
    async fn test_insert_rejects_near_empty_text() {
        let store = MemoryVectorStore::new();
        let err = store
            .insert(chunk(Uuid::new_v4(), Uuid::new_v4(), 0, "too short", vec![1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
