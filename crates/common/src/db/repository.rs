//! Repository pattern for database operations
//!
//! All data access goes through here: resume lifecycle, chunk storage with
//! pgvector similarity queries, generation records, the screening-answer
//! cache, and the append-only enhancement event log.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::vector::{NewChunk, RetrievedChunk, VectorStore, MIN_CHUNK_CHARS};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Resume Operations
    // ========================================================================

    /// Create a resume row for a freshly uploaded file
    pub async fn create_resume(
        &self,
        owner_id: Uuid,
        storage_path: String,
        original_filename: String,
        file_type: String,
        byte_size: i64,
    ) -> Result<Resume> {
        let now = chrono::Utc::now();

        let resume = ResumeActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            storage_path: Set(storage_path),
            original_filename: Set(original_filename),
            file_type: Set(file_type),
            byte_size: Set(byte_size),
            extracted_text: Set(None),
            status: Set(String::from(ResumeStatus::Pending)),
            is_default: Set(false),
            download_count: Set(0),
            last_used_at: Set(None),
            last_downloaded_at: Set(None),
            enhancement_status: Set(String::from(EnhancementState::None)),
            enhancement_started_at: Set(None),
            enhancement_completed_at: Set(None),
            enhancement_error: Set(None),
            enhancement_results: Set(None),
            enhanced_storage_path: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        resume.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find resume by ID
    pub async fn find_resume_by_id(&self, id: Uuid) -> Result<Option<Resume>> {
        ResumeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a resume and verify ownership in one step
    pub async fn find_owned_resume(&self, id: Uuid, owner_id: Uuid) -> Result<Resume> {
        let resume = self
            .find_resume_by_id(id)
            .await?
            .ok_or_else(|| AppError::ResumeNotFound { id: id.to_string() })?;
        if resume.owner_id != owner_id {
            // Ownership mismatch reads as not-found to the caller
            return Err(AppError::ResumeNotFound { id: id.to_string() });
        }
        Ok(resume)
    }

    /// List resumes for an owner, newest first
    pub async fn list_resumes(&self, owner_id: Uuid) -> Result<Vec<Resume>> {
        ResumeEntity::find()
            .filter(ResumeColumn::OwnerId.eq(owner_id))
            .order_by_desc(ResumeColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Store extracted text and move the resume to a new processing status
    pub async fn set_extracted_text(
        &self,
        resume_id: Uuid,
        text: &str,
        status: ResumeStatus,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes
            SET extracted_text = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            "#,
            vec![text.into(), String::from(status).into(), resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Update only the processing status
    pub async fn set_resume_status(&self, resume_id: Uuid, status: ResumeStatus) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE resumes SET status = $1, updated_at = NOW() WHERE id = $2",
            vec![String::from(status).into(), resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Make one resume the owner's default
    ///
    /// Clears `is_default` on every other resume first, so at most one default
    /// exists per owner. Setting the already-default resume again is a no-op
    /// observable-wise.
    pub async fn set_default_resume(&self, owner_id: Uuid, resume_id: Uuid) -> Result<()> {
        let clear = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes SET is_default = FALSE, updated_at = NOW()
            WHERE owner_id = $1 AND id <> $2 AND is_default = TRUE
            "#,
            vec![owner_id.into(), resume_id.into()],
        );
        self.write_conn().execute(clear).await?;

        let set = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            "#,
            vec![resume_id.into(), owner_id.into()],
        );
        let result = self.write_conn().execute(set).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::ResumeNotFound {
                id: resume_id.to_string(),
            });
        }
        Ok(())
    }

    /// Delete a resume; chunks and events cascade
    pub async fn delete_resume(&self, id: Uuid) -> Result<bool> {
        let result = ResumeEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Bump the download counter and stamp the download time
    pub async fn record_download(&self, resume_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes
            SET download_count = download_count + 1,
                last_downloaded_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
            vec![resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Stamp the last-used time (resume referenced by a proposal)
    pub async fn record_use(&self, resume_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE resumes SET last_used_at = NOW(), updated_at = NOW() WHERE id = $1",
            vec![resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Chunk Operations
    // ========================================================================

    /// Get chunks for a resume in index order
    pub async fn chunks_for_resume(&self, resume_id: Uuid) -> Result<Vec<ResumeChunk>> {
        ChunkEntity::find()
            .filter(ChunkColumn::ResumeId.eq(resume_id))
            .order_by_asc(ChunkColumn::ChunkIndex)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Generation Records
    // ========================================================================

    /// Persist the terminal outcome of one generation attempt
    pub async fn insert_generation_record(
        &self,
        owner_id: Uuid,
        correlation_id: Uuid,
        job_payload: serde_json::Value,
        output_text: Option<String>,
        input_tokens: i32,
        output_tokens: i32,
        cost_usd: f64,
        model: String,
        status: GenerationStatus,
    ) -> Result<GenerationRecord> {
        let record = GenerationRecordActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            correlation_id: Set(correlation_id),
            job_payload: Set(job_payload),
            output_text: Set(output_text),
            input_tokens: Set(input_tokens),
            output_tokens: Set(output_tokens),
            cost_usd: Set(cost_usd),
            model: Set(model),
            status: Set(String::from(status)),
            created_at: Set(chrono::Utc::now().into()),
        };

        record.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Latest record for a correlation id (retries write new rows)
    pub async fn latest_record_by_correlation(
        &self,
        owner_id: Uuid,
        correlation_id: Uuid,
    ) -> Result<Option<GenerationRecord>> {
        GenerationRecordEntity::find()
            .filter(GenerationRecordColumn::OwnerId.eq(owner_id))
            .filter(GenerationRecordColumn::CorrelationId.eq(correlation_id))
            .order_by_desc(GenerationRecordColumn::CreatedAt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Screening-Answer Cache
    // ========================================================================

    // Cache keys are sha256 of the normalized question, see [`question_hash`].

    /// Look up a cached answer by question hash
    pub async fn find_cached_answer(
        &self,
        owner_id: Uuid,
        question_hash: &str,
    ) -> Result<Option<CachedAnswer>> {
        AnswerCacheEntity::find()
            .filter(AnswerCacheColumn::OwnerId.eq(owner_id))
            .filter(AnswerCacheColumn::QuestionHash.eq(question_hash))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Store or replace a cached answer
    pub async fn upsert_cached_answer(
        &self,
        owner_id: Uuid,
        question_hash: &str,
        question_text: &str,
        answer_text: &str,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO answer_cache (id, owner_id, question_hash, question_text, answer_text, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (owner_id, question_hash) DO UPDATE SET
                answer_text = EXCLUDED.answer_text,
                question_text = EXCLUDED.question_text
            "#,
            vec![
                Uuid::new_v4().into(),
                owner_id.into(),
                question_hash.into(),
                question_text.into(),
                answer_text.into(),
            ],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Enhancement State Machine
    // ========================================================================

    /// Compare-and-set transition into `processing`
    ///
    /// The WHERE clause guarantees only one enhancement runs per resume:
    /// a second request while one is in flight affects zero rows and is
    /// rejected with a conflict without touching `enhancement_started_at`.
    pub async fn begin_enhancement(&self, resume_id: Uuid) -> Result<Resume> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes
            SET enhancement_status = 'processing',
                enhancement_started_at = NOW(),
                enhancement_completed_at = NULL,
                enhancement_error = NULL,
                enhancement_results = NULL,
                enhanced_storage_path = NULL,
                updated_at = NOW()
            WHERE id = $1 AND enhancement_status <> 'processing'
            "#,
            vec![resume_id.into()],
        );

        let result = self.write_conn().execute(stmt).await?;
        if result.rows_affected() == 0 {
            return match self.find_resume_by_id(resume_id).await? {
                Some(_) => Err(AppError::StateConflict {
                    resume_id: resume_id.to_string(),
                }),
                None => Err(AppError::ResumeNotFound {
                    id: resume_id.to_string(),
                }),
            };
        }

        self.find_resume_by_id(resume_id)
            .await?
            .ok_or_else(|| AppError::ResumeNotFound {
                id: resume_id.to_string(),
            })
    }

    /// Terminal transition: processing -> completed
    pub async fn complete_enhancement(
        &self,
        resume_id: Uuid,
        results: serde_json::Value,
        enhanced_storage_path: &str,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes
            SET enhancement_status = 'completed',
                enhancement_completed_at = NOW(),
                enhancement_error = NULL,
                enhancement_results = $1,
                enhanced_storage_path = $2,
                updated_at = NOW()
            WHERE id = $3 AND enhancement_status = 'processing'
            "#,
            vec![results.into(), enhanced_storage_path.into(), resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Terminal transition: processing -> failed; partial refs stay unset
    pub async fn fail_enhancement(&self, resume_id: Uuid, error: &str) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            UPDATE resumes
            SET enhancement_status = 'failed',
                enhancement_completed_at = NULL,
                enhancement_error = $1,
                enhancement_results = NULL,
                enhanced_storage_path = NULL,
                updated_at = NOW()
            WHERE id = $2 AND enhancement_status = 'processing'
            "#,
            vec![error.into(), resume_id.into()],
        );
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Enhancement Event Log
    // ========================================================================

    /// Append one event to the log
    pub async fn insert_enhancement_event(
        &self,
        resume_id: Uuid,
        owner_id: Uuid,
        event_type: EventType,
        stage: Option<String>,
        progress: i32,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        let event = EnhancementEventActiveModel {
            id: Set(Uuid::new_v4()),
            resume_id: Set(resume_id),
            owner_id: Set(owner_id),
            event_type: Set(String::from(event_type)),
            stage: Set(stage),
            progress: Set(progress),
            message: Set(message.to_string()),
            details: Set(details),
            created_at: Set(chrono::Utc::now().into()),
        };
        event.insert(self.write_conn()).await?;
        Ok(())
    }

    /// Events for a resume, oldest first
    pub async fn events_for_resume(&self, resume_id: Uuid) -> Result<Vec<EnhancementEvent>> {
        EnhancementEventEntity::find()
            .filter(EnhancementEventColumn::ResumeId.eq(resume_id))
            .order_by_asc(EnhancementEventColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

/// Hash a screening question for cache lookups
///
/// Normalization lowercases, collapses whitespace, and strips trailing
/// punctuation so trivially reworded copies of the same question hit the
/// same cache entry.
pub fn question_hash(question: &str) -> String {
    use sha2::{Digest, Sha256};

    let normalized = question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '.', '!'])
        .to_string();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serialize an embedding to the pgvector text literal "[x,y,...]"
fn embedding_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

#[async_trait]
impl VectorStore for Repository {
    async fn insert(&self, chunk: NewChunk) -> Result<Uuid> {
        if chunk.content.chars().count() < MIN_CHUNK_CHARS {
            return Err(AppError::Validation {
                message: format!("chunk below minimum length of {} chars", MIN_CHUNK_CHARS),
                field: Some("content".into()),
            });
        }

        let chunk_id = Uuid::new_v4();
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO resume_chunks (
                id, resume_id, owner_id, chunk_index, content, embedding,
                embedding_model, source_type, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6::vector, $7, $8, NOW())
            "#,
            vec![
                chunk_id.into(),
                chunk.resume_id.into(),
                chunk.owner_id.into(),
                chunk.chunk_index.into(),
                chunk.content.into(),
                embedding_literal(&chunk.embedding).into(),
                chunk.embedding_model.into(),
                chunk.source_type.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(chunk_id)
    }

    async fn nearest(
        &self,
        query: &[f32],
        owner_id: Uuid,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let embedding_str = embedding_literal(query);

        // <=> is pgvector cosine distance; created_at/chunk_index break ties
        // by insertion order.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.id as chunk_id,
                c.resume_id,
                c.chunk_index,
                c.content,
                c.source_type,
                (c.embedding <=> $1::vector) as distance
            FROM resume_chunks c
            WHERE c.owner_id = $2
              AND c.embedding IS NOT NULL
            ORDER BY c.embedding <=> $1::vector, c.created_at, c.chunk_index
            LIMIT $3
            "#,
            vec![embedding_str.into(), owner_id.into(), (k as i64).into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        let results = rows
            .into_iter()
            .filter_map(|row| {
                Some(RetrievedChunk {
                    chunk_id: row.try_get_by_index::<Uuid>(0).ok()?,
                    resume_id: row.try_get_by_index::<Uuid>(1).ok()?,
                    chunk_index: row.try_get_by_index::<i32>(2).ok()?,
                    content: row.try_get_by_index::<String>(3).ok()?,
                    source_type: row.try_get_by_index::<String>(4).ok()?,
                    distance: row.try_get_by_index::<f64>(5).ok()?,
                })
            })
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_hash_normalizes_whitespace_and_case() {
        let a = question_hash("What is your  hourly rate?");
        let b = question_hash("what is your hourly rate");
        assert_eq!(a, b);
    }

    #[test]
    fn test_question_hash_distinguishes_questions() {
        let a = question_hash("What is your hourly rate?");
        let b = question_hash("How many years of Rust experience do you have?");
        assert_ne!(a, b);
    }

    #[test]
    fn test_embedding_literal_format() {
        assert_eq!(embedding_literal(&[1.0, 0.5, -2.0]), "[1,0.5,-2]");
    }
}
