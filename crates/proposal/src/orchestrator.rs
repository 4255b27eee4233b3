//! Proposal generation orchestrator
//!
//! Single pipeline shared by the inline HTTP path and the queued worker:
//! retrieve snippets, assemble the prompt, call the model, and persist a
//! generation record at the terminal outcome. Every attempt writes exactly
//! one record; retries write new records under the same correlation id.

use crate::prompt::assemble;
use crate::retrieval::RetrievalService;
use crate::types::ProposalRequest;
use pitchforge_common::db::models::{GenerationRecord, GenerationStatus};
use pitchforge_common::db::{question_hash, Repository};
use pitchforge_common::errors::{AppError, Result};
use pitchforge_common::generation::Generator;
use pitchforge_common::metrics::{record_cache, record_generation};
use pitchforge_common::pricing::estimate_cost;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Persistence needed by the proposal pipeline
#[async_trait::async_trait]
pub trait ProposalStore: Send + Sync {
    /// Write the terminal record for one generation attempt
    #[allow(clippy::too_many_arguments)]
    async fn save_record(
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
    ) -> Result<GenerationRecord>;

    /// Look up cached screening answers, keyed by question hash
    async fn cached_answers(
        &self,
        owner_id: Uuid,
        questions: &[String],
    ) -> Result<HashMap<String, String>>;
}

#[async_trait::async_trait]
impl ProposalStore for Repository {
    async fn save_record(
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
        self.insert_generation_record(
            owner_id,
            correlation_id,
            job_payload,
            output_text,
            input_tokens,
            output_tokens,
            cost_usd,
            model,
            status,
        )
        .await
    }

    async fn cached_answers(
        &self,
        owner_id: Uuid,
        questions: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut answers = HashMap::new();
        for question in questions {
            let hash = question_hash(question);
            match self.find_cached_answer(owner_id, &hash).await? {
                Some(cached) => {
                    record_cache(true);
                    answers.insert(hash, cached.answer_text);
                }
                None => record_cache(false),
            }
        }
        Ok(answers)
    }
}

/// Proposal generation orchestrator
pub struct ProposalOrchestrator<S> {
    store: S,
    retrieval: RetrievalService,
    generator: Arc<dyn Generator>,
    /// Snippets retrieved per proposal
    retrieval_k: usize,
}

impl<S: ProposalStore> ProposalOrchestrator<S> {
    pub fn new(
        store: S,
        retrieval: RetrievalService,
        generator: Arc<dyn Generator>,
        retrieval_k: usize,
    ) -> Self {
        Self {
            store,
            retrieval,
            generator,
            retrieval_k: retrieval_k.max(1),
        }
    }

    /// Run one generation attempt end to end
    ///
    /// On success the persisted record carries the proposal text, token
    /// usage, and cost. On any pipeline error a failed record with a
    /// diagnostic message and zero tokens is persisted, then the error is
    /// propagated to the caller.
    #[instrument(skip(self, request), fields(owner_id = %owner_id, correlation_id = %correlation_id))]
    pub async fn generate_proposal(
        &self,
        owner_id: Uuid,
        correlation_id: Uuid,
        request: &ProposalRequest,
    ) -> Result<GenerationRecord> {
        let started = Instant::now();
        let model = self.generator.model_name().to_string();
        let job_payload = serde_json::to_value(request)?;

        match self.run_pipeline(owner_id, request).await {
            Ok((text, input_tokens, output_tokens)) => {
                let cost = estimate_cost(&model, input_tokens, output_tokens);
                let record = self
                    .store
                    .save_record(
                        owner_id,
                        correlation_id,
                        job_payload,
                        Some(text),
                        input_tokens,
                        output_tokens,
                        cost,
                        model.clone(),
                        GenerationStatus::Success,
                    )
                    .await?;

                record_generation(
                    started.elapsed().as_secs_f64(),
                    &model,
                    input_tokens,
                    output_tokens,
                    true,
                );
                info!(
                    input_tokens,
                    output_tokens,
                    cost_usd = cost,
                    "Proposal generated"
                );
                Ok(record)
            }
            Err(e) => {
                error!(error = %e, "Proposal generation failed");

                // Diagnostic message, never a raw stack trace
                let diagnostic = format!("Generation failed: {}", e);
                if let Err(save_err) = self
                    .store
                    .save_record(
                        owner_id,
                        correlation_id,
                        job_payload,
                        Some(diagnostic),
                        0,
                        0,
                        0.0,
                        model.clone(),
                        GenerationStatus::Failed,
                    )
                    .await
                {
                    error!(error = %save_err, "Failed to persist failed generation record");
                }

                record_generation(started.elapsed().as_secs_f64(), &model, 0, 0, false);
                Err(e)
            }
        }
    }

    /// Persist a failed record for an attempt whose pipeline never returned
    ///
    /// Used by the queued worker when a per-attempt timeout cancels the
    /// in-flight pipeline, so the attempt still leaves a terminal record.
    pub async fn record_failed_attempt(
        &self,
        owner_id: Uuid,
        correlation_id: Uuid,
        request: &ProposalRequest,
        error: &AppError,
    ) -> Result<GenerationRecord> {
        let model = self.generator.model_name().to_string();
        let job_payload = serde_json::to_value(request)?;
        self.store
            .save_record(
                owner_id,
                correlation_id,
                job_payload,
                Some(format!("Generation failed: {}", error)),
                0,
                0,
                0.0,
                model,
                GenerationStatus::Failed,
            )
            .await
    }

    async fn run_pipeline(
        &self,
        owner_id: Uuid,
        request: &ProposalRequest,
    ) -> Result<(String, i32, i32)> {
        let query_text = format!("{}\n{}", request.job.title, request.job.description);
        let snippets = self
            .retrieval
            .retrieve(owner_id, &query_text, self.retrieval_k)
            .await?;

        let cached_answers = self
            .store
            .cached_answers(owner_id, &request.job.screening_questions)
            .await?;

        let prompt = assemble(
            &request.job,
            &snippets,
            request.profile.as_ref(),
            &request.portfolio,
            &cached_answers,
            &request.settings,
        );

        let generation = self.generator.generate(&prompt.system, &prompt.user).await?;

        Ok((
            generation.text,
            generation.input_tokens,
            generation.output_tokens,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobPosting, ProposalSettings};
    use pitchforge_common::embeddings::{FailingEmbedder, MockEmbedder};
    use pitchforge_common::errors::AppError;
    use pitchforge_common::generation::{FailingGenerator, MockGenerator};
    use pitchforge_common::vector::MemoryVectorStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryProposalStore {
        records: Mutex<Vec<GenerationRecord>>,
        answers: Mutex<HashMap<String, String>>,
    }

    impl MemoryProposalStore {
        fn records(&self) -> Vec<GenerationRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ProposalStore for MemoryProposalStore {
        async fn save_record(
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
            let record = GenerationRecord {
                id: Uuid::new_v4(),
                owner_id,
                correlation_id,
                job_payload,
                output_text,
                input_tokens,
                output_tokens,
                cost_usd,
                model,
                status: String::from(status),
                created_at: chrono::Utc::now().into(),
            };
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn cached_answers(
            &self,
            _owner_id: Uuid,
            questions: &[String],
        ) -> Result<HashMap<String, String>> {
            let answers = self.answers.lock().unwrap();
            Ok(questions
                .iter()
                .filter_map(|q| {
                    let hash = question_hash(q);
                    answers.get(&hash).map(|a| (hash, a.clone()))
                })
                .collect())
        }
    }

    fn request() -> ProposalRequest {
        ProposalRequest {
            job: JobPosting {
                title: "Rust backend engineer".to_string(),
                description: "Build a low-latency API.".to_string(),
                skills: vec!["rust".to_string()],
                screening_questions: vec![],
            },
            profile: None,
            portfolio: vec![],
            settings: ProposalSettings::default(),
        }
    }

    fn orchestrator_with(
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn pitchforge_common::Embedder>,
    ) -> ProposalOrchestrator<MemoryProposalStore> {
        let retrieval = RetrievalService::new(embedder, Arc::new(MemoryVectorStore::new()));
        ProposalOrchestrator::new(MemoryProposalStore::default(), retrieval, generator, 6)
    }

    #[tokio::test]
    async fn test_success_persists_record_with_usage_and_cost() {
        let orchestrator = orchestrator_with(
            Arc::new(MockGenerator::new("Dear client, I can build this API.")),
            Arc::new(MockEmbedder::new(64)),
        );

        let record = orchestrator
            .generate_proposal(Uuid::new_v4(), Uuid::new_v4(), &request())
            .await
            .unwrap();

        assert_eq!(record.generation_status(), GenerationStatus::Success);
        assert!(record.input_tokens > 0);
        assert!(record.output_tokens > 0);
        assert!(record.cost_usd > 0.0);
        assert_eq!(
            record.output_text.as_deref(),
            Some("Dear client, I can build this API.")
        );
    }

    #[tokio::test]
    async fn test_zero_resumes_still_invokes_generator() {
        let generator = Arc::new(MockGenerator::new("Proposal without resume grounding."));
        let orchestrator =
            orchestrator_with(generator.clone(), Arc::new(MockEmbedder::new(64)));

        let record = orchestrator
            .generate_proposal(Uuid::new_v4(), Uuid::new_v4(), &request())
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 1);
        assert_eq!(record.generation_status(), GenerationStatus::Success);
    }

    #[tokio::test]
    async fn test_generation_failure_persists_failed_record_with_zero_tokens() {
        let orchestrator = orchestrator_with(
            Arc::new(FailingGenerator),
            Arc::new(MockEmbedder::new(64)),
        );

        let err = orchestrator
            .generate_proposal(Uuid::new_v4(), Uuid::new_v4(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));

        let records = orchestrator.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].generation_status(), GenerationStatus::Failed);
        assert_eq!(records[0].input_tokens, 0);
        assert_eq!(records[0].output_tokens, 0);
        assert_eq!(records[0].cost_usd, 0.0);
        assert!(records[0]
            .output_text
            .as_deref()
            .unwrap()
            .starts_with("Generation failed:"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_aborts_before_generation() {
        let generator = Arc::new(MockGenerator::new("never used"));
        let orchestrator = orchestrator_with(
            generator.clone(),
            Arc::new(FailingEmbedder::new(64, vec!["Rust".to_string()])),
        );

        let err = orchestrator
            .generate_proposal(Uuid::new_v4(), Uuid::new_v4(), &request())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Retrieval { .. }));
        assert_eq!(generator.call_count(), 0);

        // The failed attempt is still recorded
        let records = orchestrator.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].generation_status(), GenerationStatus::Failed);
    }

    #[tokio::test]
    async fn test_retries_write_new_records_under_one_correlation() {
        let orchestrator = orchestrator_with(
            Arc::new(FailingGenerator),
            Arc::new(MockEmbedder::new(64)),
        );
        let owner = Uuid::new_v4();
        let correlation = Uuid::new_v4();

        for _ in 0..3 {
            let _ = orchestrator
                .generate_proposal(owner, correlation, &request())
                .await;
        }

        let records = orchestrator.store.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.correlation_id == correlation));
    }
}
