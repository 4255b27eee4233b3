//! Enhancement event logging
//!
//! Append-only structured events for every observable step of an enhancement
//! run, mirrored to tracing so operators see the same stream as pollers.

use pitchforge_common::db::models::EventType;
use pitchforge_common::db::Repository;
use pitchforge_common::errors::Result;
use tracing::info;
use uuid::Uuid;

/// One event ready to append
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub stage: Option<String>,
    pub progress: i32,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// Destination for enhancement events
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn append_event(&self, resume_id: Uuid, owner_id: Uuid, event: NewEvent) -> Result<()>;
}

#[async_trait::async_trait]
impl EventSink for Repository {
    async fn append_event(&self, resume_id: Uuid, owner_id: Uuid, event: NewEvent) -> Result<()> {
        self.insert_enhancement_event(
            resume_id,
            owner_id,
            event.event_type,
            event.stage,
            event.progress,
            &event.message,
            event.details,
        )
        .await
    }
}

/// Logger bound to one resume's enhancement run
pub struct EnhancementLog<'a> {
    sink: &'a dyn EventSink,
    resume_id: Uuid,
    owner_id: Uuid,
}

impl<'a> EnhancementLog<'a> {
    pub fn new(sink: &'a dyn EventSink, resume_id: Uuid, owner_id: Uuid) -> Self {
        Self {
            sink,
            resume_id,
            owner_id,
        }
    }

    pub async fn started(&self, filename: &str, file_type: &str) -> Result<()> {
        info!(
            resume_id = %self.resume_id,
            filename,
            file_type,
            "Enhancement started"
        );
        self.sink
            .append_event(
                self.resume_id,
                self.owner_id,
                NewEvent {
                    event_type: EventType::Started,
                    stage: None,
                    progress: 0,
                    message: format!("Enhancement started for {}", filename),
                    details: Some(serde_json::json!({
                        "filename": filename,
                        "file_type": file_type,
                    })),
                },
            )
            .await
    }

    pub async fn stage(&self, name: &str, progress: i32, description: &str, details: serde_json::Value) -> Result<()> {
        info!(
            resume_id = %self.resume_id,
            stage = name,
            progress,
            "Enhancement stage"
        );
        self.sink
            .append_event(
                self.resume_id,
                self.owner_id,
                NewEvent {
                    event_type: EventType::Stage,
                    stage: Some(name.to_string()),
                    progress,
                    message: description.to_string(),
                    details: Some(details),
                },
            )
            .await
    }

    pub async fn completed(&self, report: serde_json::Value) -> Result<()> {
        info!(resume_id = %self.resume_id, "Enhancement completed");
        self.sink
            .append_event(
                self.resume_id,
                self.owner_id,
                NewEvent {
                    event_type: EventType::Completed,
                    stage: None,
                    progress: 100,
                    message: "Enhancement completed".to_string(),
                    details: Some(report),
                },
            )
            .await
    }

    pub async fn failed(&self, error: &str) -> Result<()> {
        info!(resume_id = %self.resume_id, error, "Enhancement failed");
        self.sink
            .append_event(
                self.resume_id,
                self.owner_id,
                NewEvent {
                    event_type: EventType::Failed,
                    stage: None,
                    progress: 0,
                    message: format!("Enhancement failed: {}", error),
                    details: None,
                },
            )
            .await
    }
}

/// Record a download of either resume variant
///
/// Not tied to a run: downloads happen at any time after completion.
pub async fn log_download(
    sink: &dyn EventSink,
    resume_id: Uuid,
    owner_id: Uuid,
    variant: &str,
) -> Result<()> {
    info!(resume_id = %resume_id, variant, "Resume downloaded");
    sink.append_event(
        resume_id,
        owner_id,
        NewEvent {
            event_type: EventType::Download,
            stage: None,
            progress: 0,
            message: format!("Resume downloaded ({})", variant),
            details: Some(serde_json::json!({ "variant": variant })),
        },
    )
    .await
}
