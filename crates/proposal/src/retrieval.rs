//! Retrieval service
//!
//! Embeds a query and returns the owner's nearest resume chunks as snippets
//! ready for prompt interpolation. A query-embedding failure is fatal for the
//! retrieval: generation never proceeds silently without grounding.

use pitchforge_common::embeddings::Embedder;
use pitchforge_common::errors::{AppError, Result};
use pitchforge_common::metrics::record_retrieval;
use pitchforge_common::vector::VectorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A retrieved snippet ready for prompt interpolation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    /// Where the snippet came from, e.g. "resume"
    pub source: String,
}

/// Retrieval over the owner's embedded resume chunks
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn Embedder>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { embedder, vectors }
    }

    /// Retrieve up to `k` snippets most relevant to the query text
    #[instrument(skip(self, query_text), fields(owner_id = %owner_id, k))]
    pub async fn retrieve(
        &self,
        owner_id: Uuid,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<Snippet>> {
        let started = Instant::now();

        let query_embedding =
            self.embedder
                .embed(query_text)
                .await
                .map_err(|e| AppError::Retrieval {
                    message: format!("query embedding failed: {}", e),
                })?;

        let chunks = self.vectors.nearest(&query_embedding, owner_id, k).await?;

        let snippets: Vec<Snippet> = chunks
            .into_iter()
            .map(|c| Snippet {
                text: c.content,
                source: c.source_type,
            })
            .collect();

        debug!(count = snippets.len(), "Snippets retrieved");
        record_retrieval(started.elapsed().as_secs_f64(), snippets.len());

        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchforge_common::embeddings::{FailingEmbedder, MockEmbedder};
    use pitchforge_common::vector::{MemoryVectorStore, NewChunk};

    async fn seed_store(store: &MemoryVectorStore, owner: Uuid, texts: &[&str]) {
        let embedder = MockEmbedder::new(64);
        let resume_id = Uuid::new_v4();
        for (i, text) in texts.iter().enumerate() {
            let embedding = embedder.embed(text).await.unwrap();
            store
                .insert(NewChunk {
                    resume_id,
                    owner_id: owner,
                    chunk_index: i as i32,
                    content: text.to_string(),
                    embedding,
                    embedding_model: "mock-embedding".to_string(),
                    source_type: "resume".to_string(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_retrieve_returns_owner_snippets() {
        let store = Arc::new(MemoryVectorStore::new());
        let owner = Uuid::new_v4();
        seed_store(
            &store,
            owner,
            &[
                "Built high-throughput Rust services.",
                "Maintained PostgreSQL clusters in production.",
            ],
        )
        .await;

        let service = RetrievalService::new(Arc::new(MockEmbedder::new(64)), store);
        let snippets = service
            .retrieve(owner, "Rust backend engineer wanted", 6)
            .await
            .unwrap();

        assert_eq!(snippets.len(), 2);
        assert!(snippets.iter().all(|s| s.source == "resume"));
    }

    #[tokio::test]
    async fn test_retrieve_with_no_chunks_is_empty_not_error() {
        let service = RetrievalService::new(
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MemoryVectorStore::new()),
        );
        let snippets = service
            .retrieve(Uuid::new_v4(), "any query", 6)
            .await
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_retrieval_error() {
        let service = RetrievalService::new(
            Arc::new(FailingEmbedder::new(64, vec!["query".to_string()])),
            Arc::new(MemoryVectorStore::new()),
        );
        let err = service
            .retrieve(Uuid::new_v4(), "failing query text", 6)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Retrieval { .. }));
    }
}
