//! Resume enhancement pipeline
//!
//! State machine: none/failed/completed -> processing -> {completed | failed}.
//! The transition into processing is a compare-and-set guard; a resume with a
//! run already in flight is rejected with a conflict and left untouched.
//! Stage events are emitted before the document render, so partial progress
//! stays observable even when a run ultimately fails.

use crate::events::{EnhancementLog, EventSink};
use crate::renderer::DocumentRenderer;
use crate::scorer::ImprovementScorer;
use crate::stages::STAGES;
use pitchforge_common::blob::BlobStore;
use pitchforge_common::db::models::Resume;
use pitchforge_common::db::Repository;
use pitchforge_common::errors::{AppError, Result};
use pitchforge_common::generation::Generator;
use pitchforge_common::metrics::record_enhancement;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Resume state transitions needed by the pipeline
#[async_trait::async_trait]
pub trait EnhancementStore: EventSink {
    /// Compare-and-set transition into processing
    ///
    /// Fails with a state conflict when a run is already in flight, leaving
    /// the existing run's timestamps untouched.
    async fn begin(&self, resume_id: Uuid) -> Result<Resume>;

    /// Terminal transition to completed with the report and document pointer
    async fn complete(
        &self,
        resume_id: Uuid,
        results: serde_json::Value,
        enhanced_storage_path: &str,
    ) -> Result<()>;

    /// Terminal transition to failed; partial artifacts stay unset
    async fn fail(&self, resume_id: Uuid, error: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl EnhancementStore for Repository {
    async fn begin(&self, resume_id: Uuid) -> Result<Resume> {
        self.begin_enhancement(resume_id).await
    }

    async fn complete(
        &self,
        resume_id: Uuid,
        results: serde_json::Value,
        enhanced_storage_path: &str,
    ) -> Result<()> {
        self.complete_enhancement(resume_id, results, enhanced_storage_path)
            .await
    }

    async fn fail(&self, resume_id: Uuid, error: &str) -> Result<()> {
        self.fail_enhancement(resume_id, error).await
    }
}

const SYSTEM_PROMPT: &str =
    "You are an expert resume writer specializing in ATS optimization. Rewrite \
     the resume below: keep every fact truthful and every employer and date \
     unchanged, use strong action verbs, quantify achievements where the \
     original provides numbers, and structure it with standard section \
     headings. Return only the rewritten resume text.";

/// Resume enhancement pipeline
pub struct EnhancementPipeline<S> {
    store: S,
    generator: Arc<dyn Generator>,
    renderer: Arc<dyn DocumentRenderer>,
    scorer: Arc<dyn ImprovementScorer>,
    blobs: Arc<dyn BlobStore>,
}

impl<S: EnhancementStore> EnhancementPipeline<S> {
    pub fn new(
        store: S,
        generator: Arc<dyn Generator>,
        renderer: Arc<dyn DocumentRenderer>,
        scorer: Arc<dyn ImprovementScorer>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            store,
            generator,
            renderer,
            scorer,
            blobs,
        }
    }

    /// Run one enhancement end to end
    ///
    /// Rejected with a state conflict if a run is already processing. Any
    /// failure after the processing transition lands the resume in `failed`
    /// with the error message persisted, and the error is propagated.
    #[instrument(skip(self), fields(resume_id = %resume_id))]
    pub async fn enhance(&self, resume_id: Uuid) -> Result<()> {
        let started = Instant::now();

        // CAS guard; a conflict propagates before any event is written
        let resume = self.store.begin(resume_id).await?;

        let log = EnhancementLog::new(&self.store, resume.id, resume.owner_id);
        log.started(&resume.original_filename, &resume.file_type).await?;

        match self.run_stages(&resume, &log).await {
            Ok(()) => {
                record_enhancement(started.elapsed().as_secs_f64(), true);
                info!(resume_id = %resume_id, "Enhancement run complete");
                Ok(())
            }
            Err(e) => {
                error!(resume_id = %resume_id, error = %e, "Enhancement run failed");
                if let Err(fail_err) = self.store.fail(resume_id, &e.to_string()).await {
                    error!(error = %fail_err, "Failed to mark enhancement as failed");
                }
                if let Err(log_err) = log.failed(&e.to_string()).await {
                    error!(error = %log_err, "Failed to log enhancement failure");
                }
                record_enhancement(started.elapsed().as_secs_f64(), false);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, resume: &Resume, log: &EnhancementLog<'_>) -> Result<()> {
        let original_text = resume
            .extracted_text
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::EnhancementFailed {
                message: "resume has no extracted text to enhance".to_string(),
            })?;

        // All stage events go out before the render, keeping partial
        // progress observable if the render or storage write fails.
        for stage in &STAGES {
            log.stage(stage.name, stage.progress, stage.description, stage.details())
                .await?;
        }

        let generation = self.generator.generate(SYSTEM_PROMPT, &original_text).await?;
        let enhanced_text = generation.text;

        let rendered = self
            .renderer
            .render(&resume.original_filename, &enhanced_text)?;
        let enhanced_path = self
            .blobs
            .store("enhanced", self.renderer.extension(), &rendered)
            .await?;

        let report = self.scorer.score(&original_text, &enhanced_text);
        let results = serde_json::json!({
            "enhanced_text": enhanced_text,
            "report": report,
        });

        self.store
            .complete(resume.id, results.clone(), &enhanced_path)
            .await?;
        log.completed(serde_json::to_value(&report)?).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NewEvent;
    use crate::renderer::TextRenderer;
    use crate::scorer::HeuristicScorer;
    use pitchforge_common::blob::MemoryBlobStore;
    use pitchforge_common::db::models::{EnhancementState, EventType, ResumeStatus};
    use pitchforge_common::generation::{FailingGenerator, MockGenerator};
    use std::sync::Mutex;

    struct MemoryEnhancementStore {
        resume: Mutex<Resume>,
        events: Mutex<Vec<NewEvent>>,
    }

    impl MemoryEnhancementStore {
        fn new(resume: Resume) -> Self {
            Self {
                resume: Mutex::new(resume),
                events: Mutex::new(Vec::new()),
            }
        }

        fn state(&self) -> EnhancementState {
            self.resume.lock().unwrap().enhancement_state()
        }

        fn started_at(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
            self.resume.lock().unwrap().enhancement_started_at
        }

        fn events(&self) -> Vec<NewEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl EventSink for MemoryEnhancementStore {
        async fn append_event(
            &self,
            _resume_id: Uuid,
            _owner_id: Uuid,
            event: NewEvent,
        ) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl EnhancementStore for MemoryEnhancementStore {
        async fn begin(&self, resume_id: Uuid) -> Result<Resume> {
            let mut resume = self.resume.lock().unwrap();
            if resume.id != resume_id {
                return Err(AppError::ResumeNotFound {
                    id: resume_id.to_string(),
                });
            }
            if resume.enhancement_in_flight() {
                return Err(AppError::StateConflict {
                    resume_id: resume_id.to_string(),
                });
            }
            resume.enhancement_status = String::from(EnhancementState::Processing);
            resume.enhancement_started_at = Some(chrono::Utc::now().into());
            resume.enhancement_completed_at = None;
            resume.enhancement_error = None;
            resume.enhancement_results = None;
            resume.enhanced_storage_path = None;
            Ok(resume.clone())
        }

        async fn complete(
            &self,
            _resume_id: Uuid,
            results: serde_json::Value,
            enhanced_storage_path: &str,
        ) -> Result<()> {
            let mut resume = self.resume.lock().unwrap();
            resume.enhancement_status = String::from(EnhancementState::Completed);
            resume.enhancement_completed_at = Some(chrono::Utc::now().into());
            resume.enhancement_results = Some(results);
            resume.enhanced_storage_path = Some(enhanced_storage_path.to_string());
            Ok(())
        }

        async fn fail(&self, _resume_id: Uuid, error: &str) -> Result<()> {
            let mut resume = self.resume.lock().unwrap();
            resume.enhancement_status = String::from(EnhancementState::Failed);
            resume.enhancement_error = Some(error.to_string());
            resume.enhancement_results = None;
            resume.enhanced_storage_path = None;
            Ok(())
        }
    }

    fn test_resume(text: Option<&str>) -> Resume {
        let now = chrono::Utc::now();
        Resume {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            storage_path: "resumes/original.txt".to_string(),
            original_filename: "resume.txt".to_string(),
            file_type: "txt".to_string(),
            byte_size: 100,
            extracted_text: text.map(String::from),
            status: String::from(ResumeStatus::Ready),
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

    fn pipeline_with(
        resume: Resume,
        generator: Arc<dyn Generator>,
    ) -> (EnhancementPipeline<MemoryEnhancementStore>, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let pipeline = EnhancementPipeline::new(
            MemoryEnhancementStore::new(resume),
            generator,
            Arc::new(TextRenderer),
            Arc::new(HeuristicScorer),
            blobs.clone(),
        );
        (pipeline, blobs)
    }

    #[tokio::test]
    async fn test_successful_run_completes_with_report_and_document() {
        let resume = test_resume(Some("Responsible for backend. Did database work."));
        let resume_id = resume.id;
        let (pipeline, blobs) = pipeline_with(
            resume,
            Arc::new(MockGenerator::new(
                "Led backend development. Reduced query latency by 40 percent.",
            )),
        );

        pipeline.enhance(resume_id).await.unwrap();

        assert_eq!(pipeline.store.state(), EnhancementState::Completed);
        assert_eq!(blobs.len(), 1);

        let resume = pipeline.store.resume.lock().unwrap().clone();
        assert!(resume.enhanced_storage_path.is_some());
        let results = resume.enhancement_results.unwrap();
        assert!(results["report"]["keyword_score_after"].is_number());

        // started, five stages, completed
        let events = pipeline.store.events();
        assert_eq!(events.len(), 7);
        assert_eq!(events[0].event_type, EventType::Started);
        assert_eq!(events[6].event_type, EventType::Completed);
    }

    #[tokio::test]
    async fn test_stage_progress_is_monotonic_in_event_stream() {
        let resume = test_resume(Some("Some extracted resume text for the run."));
        let resume_id = resume.id;
        let (pipeline, _) = pipeline_with(resume, Arc::new(MockGenerator::new("Enhanced.")));

        pipeline.enhance(resume_id).await.unwrap();

        let progresses: Vec<i32> = pipeline
            .store
            .events()
            .iter()
            .filter(|e| e.event_type == EventType::Stage)
            .map(|e| e.progress)
            .collect();
        assert_eq!(progresses, vec![15, 35, 55, 75, 95]);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected_and_keeps_started_at() {
        let resume = test_resume(Some("Extracted resume text goes here."));
        let resume_id = resume.id;
        let (pipeline, _) = pipeline_with(resume, Arc::new(MockGenerator::new("Enhanced.")));

        // First transition takes the slot
        pipeline.store.begin(resume_id).await.unwrap();
        let started_at = pipeline.store.started_at();

        let err = pipeline.enhance(resume_id).await.unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        // The in-flight run's start timestamp is untouched and no events
        // were written for the rejected request
        assert_eq!(pipeline.store.started_at(), started_at);
        assert_eq!(pipeline.store.state(), EnhancementState::Processing);
        assert!(pipeline.store.events().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_lands_in_failed_with_stages_logged() {
        let resume = test_resume(Some("Extracted resume text goes here."));
        let resume_id = resume.id;
        let (pipeline, blobs) = pipeline_with(resume, Arc::new(FailingGenerator));

        let err = pipeline.enhance(resume_id).await.unwrap_err();
        assert!(matches!(err, AppError::Generation { .. }));

        assert_eq!(pipeline.store.state(), EnhancementState::Failed);
        assert!(blobs.is_empty());

        let resume = pipeline.store.resume.lock().unwrap().clone();
        assert!(resume.enhancement_error.is_some());
        assert!(resume.enhancement_results.is_none());
        assert!(resume.enhanced_storage_path.is_none());

        // Stage events were still emitted before the failure
        let events = pipeline.store.events();
        let stage_count = events
            .iter()
            .filter(|e| e.event_type == EventType::Stage)
            .count();
        assert_eq!(stage_count, 5);
        assert_eq!(events.last().unwrap().event_type, EventType::Failed);
    }

    #[tokio::test]
    async fn test_missing_text_fails_cleanly() {
        let resume = test_resume(None);
        let resume_id = resume.id;
        let (pipeline, _) = pipeline_with(resume, Arc::new(MockGenerator::new("Enhanced.")));

        let err = pipeline.enhance(resume_id).await.unwrap_err();
        assert!(matches!(err, AppError::EnhancementFailed { .. }));
        assert_eq!(pipeline.store.state(), EnhancementState::Failed);
    }

    #[tokio::test]
    async fn test_rerun_after_failure_is_allowed() {
        let resume = test_resume(Some("Extracted resume text goes here."));
        let resume_id = resume.id;
        let (pipeline, _) = pipeline_with(resume, Arc::new(MockGenerator::new("Enhanced.")));

        pipeline.store.begin(resume_id).await.unwrap();
        pipeline.store.fail(resume_id, "boom").await.unwrap();
        assert_eq!(pipeline.store.state(), EnhancementState::Failed);

        pipeline.enhance(resume_id).await.unwrap();
        assert_eq!(pipeline.store.state(), EnhancementState::Completed);
    }
}
