//! Ingestion processor
//!
//! Core pipeline for an uploaded resume: read the stored file, extract text,
//! chunk, embed each chunk, and write the chunks to the vector store. A
//! failed embedding skips that chunk; the resume still becomes ready with
//! whatever chunks survived.

use crate::chunker::chunk_text;
use crate::extractor::{detect_skills, extract_text, years_of_experience};
use futures::stream::{self, StreamExt};
use pitchforge_common::blob::BlobStore;
use pitchforge_common::db::models::{Resume, ResumeStatus};
use pitchforge_common::db::Repository;
use pitchforge_common::embeddings::Embedder;
use pitchforge_common::errors::{AppError, Result};
use pitchforge_common::metrics::record_ingestion;
use pitchforge_common::vector::{NewChunk, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Source type recorded on every chunk this pipeline produces
const SOURCE_TYPE_RESUME: &str = "resume";

/// Resume state access needed by the ingestion pipeline
#[async_trait::async_trait]
pub trait IngestionStore: Send + Sync {
    /// Load the resume row being ingested
    async fn fetch_resume(&self, resume_id: Uuid) -> Result<Resume>;

    /// Persist extracted text
    async fn store_extracted_text(&self, resume_id: Uuid, text: &str) -> Result<()>;

    /// Move the resume to a new processing status
    async fn mark_status(&self, resume_id: Uuid, status: ResumeStatus) -> Result<()>;
}

#[async_trait::async_trait]
impl IngestionStore for Repository {
    async fn fetch_resume(&self, resume_id: Uuid) -> Result<Resume> {
        self.find_resume_by_id(resume_id)
            .await?
            .ok_or_else(|| AppError::ResumeNotFound {
                id: resume_id.to_string(),
            })
    }

    async fn store_extracted_text(&self, resume_id: Uuid, text: &str) -> Result<()> {
        self.set_extracted_text(resume_id, text, ResumeStatus::Processing)
            .await
    }

    async fn mark_status(&self, resume_id: Uuid, status: ResumeStatus) -> Result<()> {
        self.set_resume_status(resume_id, status).await
    }
}

/// Ingestion processor
pub struct IngestionProcessor<S> {
    store: S,
    blobs: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    /// Concurrent embedding requests per resume
    concurrency: usize,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub chunks_stored: usize,
    pub chunks_skipped: usize,
}

impl<S: IngestionStore> IngestionProcessor<S> {
    pub fn new(
        store: S,
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            blobs,
            embedder,
            vectors,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the full pipeline for one resume
    #[instrument(skip(self), fields(resume_id = %resume_id))]
    pub async fn process_resume(&self, resume_id: Uuid) -> Result<IngestionOutcome> {
        let started = Instant::now();
        info!("Processing resume ingestion");

        let resume = self.store.fetch_resume(resume_id).await?;

        match self.run_pipeline(&resume).await {
            Ok(outcome) => {
                self.store.mark_status(resume_id, ResumeStatus::Ready).await?;
                record_ingestion(
                    started.elapsed().as_secs_f64(),
                    outcome.chunks_stored,
                    outcome.chunks_skipped,
                );
                info!(
                    chunks_stored = outcome.chunks_stored,
                    chunks_skipped = outcome.chunks_skipped,
                    "Resume ingestion complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                // Mark failed but surface the original error to the worker
                if let Err(mark_err) = self.store.mark_status(resume_id, ResumeStatus::Failed).await
                {
                    warn!(error = %mark_err, "Failed to mark resume as failed");
                }
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, resume: &Resume) -> Result<IngestionOutcome> {
        let bytes = self.blobs.read(&resume.storage_path).await?;

        let text = extract_text(&bytes, &resume.file_type);
        self.store.store_extracted_text(resume.id, &text).await?;

        // Metadata pass over the extracted text, logged for operators
        let skills = detect_skills(&text);
        info!(
            skill_count = skills.len(),
            skills = ?skills,
            years_of_experience = years_of_experience(&text),
            "Resume metadata extracted"
        );

        let chunks = chunk_text(&text);
        info!(chunk_count = chunks.len(), "Text chunked");

        // Embed concurrently; a failed chunk is logged and skipped so one bad
        // embedding never sinks the whole resume.
        let embedder = &self.embedder;
        let embedded: Vec<Option<(i32, String, Vec<f32>)>> = stream::iter(chunks)
            .map(|chunk| async move {
                match embedder.embed(&chunk.content).await {
                    Ok(embedding) => Some((chunk.index, chunk.content, embedding)),
                    Err(e) => {
                        warn!(
                            resume_id = %resume.id,
                            chunk_index = chunk.index,
                            error = %e,
                            "Embedding failed, skipping chunk"
                        );
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut stored = 0;
        let mut skipped = 0;
        for item in embedded {
            match item {
                Some((index, content, embedding)) => {
                    self.vectors
                        .insert(NewChunk {
                            resume_id: resume.id,
                            owner_id: resume.owner_id,
                            chunk_index: index,
                            content,
                            embedding,
                            embedding_model: self.embedder.model_name().to_string(),
                            source_type: SOURCE_TYPE_RESUME.to_string(),
                        })
                        .await?;
                    stored += 1;
                }
                None => skipped += 1,
            }
        }

        Ok(IngestionOutcome {
            chunks_stored: stored,
            chunks_skipped: skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchforge_common::blob::MemoryBlobStore;
    use pitchforge_common::db::models::EnhancementState;
    use pitchforge_common::embeddings::{FailingEmbedder, MockEmbedder};
    use pitchforge_common::vector::MemoryVectorStore;
    use std::sync::Mutex;

    struct MemoryStore {
        resume: Mutex<Resume>,
    }

    impl MemoryStore {
        fn new(resume: Resume) -> Self {
            Self {
                resume: Mutex::new(resume),
            }
        }

        fn status(&self) -> ResumeStatus {
            self.resume.lock().unwrap().resume_status()
        }

        fn text(&self) -> Option<String> {
            self.resume.lock().unwrap().extracted_text.clone()
        }
    }

    #[async_trait::async_trait]
    impl IngestionStore for MemoryStore {
        async fn fetch_resume(&self, resume_id: Uuid) -> Result<Resume> {
            let resume = self.resume.lock().unwrap().clone();
            if resume.id != resume_id {
                return Err(AppError::ResumeNotFound {
                    id: resume_id.to_string(),
                });
            }
            Ok(resume)
        }

        async fn store_extracted_text(&self, _resume_id: Uuid, text: &str) -> Result<()> {
            let mut resume = self.resume.lock().unwrap();
            resume.extracted_text = Some(text.to_string());
            resume.status = String::from(ResumeStatus::Processing);
            Ok(())
        }

        async fn mark_status(&self, _resume_id: Uuid, status: ResumeStatus) -> Result<()> {
            self.resume.lock().unwrap().status = String::from(status);
            Ok(())
        }
    }

    fn test_resume(storage_path: &str) -> Resume {
        let now = chrono::Utc::now();
        Resume {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            storage_path: storage_path.to_string(),
            original_filename: "resume.txt".to_string(),
            file_type: "txt".to_string(),
            byte_size: 0,
            extracted_text: None,
            status: String::from(ResumeStatus::Pending),
            is_default: false,
            download_count: 0,
            last_used_at: None,
            last_downloaded_at: None,
            enhancement_status: String::from(EnhancementState::None),
            enhancement_started_at: None,
            enhancement_completed_at: None,
            enhancement_error: None,
            enhancement_results: None,
            enhanced_storage_path: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_stores_chunks_and_marks_ready() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let content = "Senior Rust engineer with ten years of experience. \
                       Built event-driven ingestion pipelines on AWS. \
                       Led migration of a monolith to microservices.";
        let key = blobs.store("resumes", "txt", content.as_bytes()).await.unwrap();

        let resume = test_resume(&key);
        let resume_id = resume.id;
        let store = MemoryStore::new(resume);
        let vectors = Arc::new(MemoryVectorStore::new());

        let processor = IngestionProcessor::new(
            store,
            blobs,
            Arc::new(MockEmbedder::new(64)),
            vectors.clone(),
            4,
        );

        let outcome = processor.process_resume(resume_id).await.unwrap();

        assert_eq!(outcome.chunks_stored, 3);
        assert_eq!(outcome.chunks_skipped, 0);
        assert_eq!(processor.store.status(), ResumeStatus::Ready);
        assert!(processor.store.text().unwrap().contains("Senior Rust engineer"));

        let stored = vectors.chunks_for_resume(resume_id);
        let indices: Vec<i32> = stored.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_only_that_chunk() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let content = "First sentence about backend work. \
                       Second sentence mentions the poison marker. \
                       Third sentence about database tuning.";
        let key = blobs.store("resumes", "txt", content.as_bytes()).await.unwrap();

        let resume = test_resume(&key);
        let resume_id = resume.id;
        let store = MemoryStore::new(resume);
        let vectors = Arc::new(MemoryVectorStore::new());

        let processor = IngestionProcessor::new(
            store,
            blobs,
            Arc::new(FailingEmbedder::new(64, vec!["poison".to_string()])),
            vectors.clone(),
            4,
        );

        let outcome = processor.process_resume(resume_id).await.unwrap();

        assert_eq!(outcome.chunks_stored, 2);
        assert_eq!(outcome.chunks_skipped, 1);
        assert_eq!(processor.store.status(), ResumeStatus::Ready);

        // The surviving chunks keep their original document indices
        let stored = vectors.chunks_for_resume(resume_id);
        let indices: Vec<i32> = stored.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_missing_blob_marks_resume_failed() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let resume = test_resume("resumes/never-stored.txt");
        let resume_id = resume.id;
        let store = MemoryStore::new(resume);

        let processor = IngestionProcessor::new(
            store,
            blobs,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MemoryVectorStore::new()),
            4,
        );

        let err = processor.process_resume(resume_id).await.unwrap_err();
        assert!(matches!(err, AppError::BlobError { .. }));
        assert_eq!(processor.store.status(), ResumeStatus::Failed);
    }

    #[tokio::test]
    async fn test_unparseable_file_still_becomes_ready() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let key = blobs.store("resumes", "pdf", b"garbage bytes").await.unwrap();

        let mut resume = test_resume(&key);
        resume.file_type = "pdf".to_string();
        let resume_id = resume.id;
        let store = MemoryStore::new(resume);

        let processor = IngestionProcessor::new(
            store,
            blobs,
            Arc::new(MockEmbedder::new(64)),
            Arc::new(MemoryVectorStore::new()),
            4,
        );

        let outcome = processor.process_resume(resume_id).await.unwrap();

        // The placeholder text chunks and embeds like any other content
        assert!(outcome.chunks_stored >= 1);
        assert_eq!(processor.store.status(), ResumeStatus::Ready);
    }
}
