//! Resume enhancement handlers
//!
//! Enhancement runs asynchronously; these endpoints start a run, report its
//! current state, and expose the append-only event stream for progress
//! polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::OwnerId;
use crate::AppState;
use pitchforge_common::{
    db::models::{EnhancementState, ResumeStatus},
    errors::{AppError, Result},
    queue::EnhancementJobMessage,
};
use pitchforge_enhancement::report::EnhancementSummary;

#[derive(Serialize)]
pub struct StartEnhancementResponse {
    pub resume_id: Uuid,
    pub status: String,
    pub poll_url: String,
}

#[derive(Serialize)]
pub struct EnhancementStatusResponse {
    pub resume_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<EnhancementSummary>,
}

#[derive(Serialize)]
pub struct EnhancementEventResponse {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub progress: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

/// Start an enhancement run for a resume
pub async fn start_enhancement(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StartEnhancementResponse>)> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;

    if resume.resume_status() != ResumeStatus::Ready {
        return Err(AppError::Validation {
            message: format!(
                "Resume is not ready for enhancement (status: {})",
                resume.status
            ),
            field: None,
        });
    }

    if resume.enhancement_in_flight() {
        return Err(AppError::StateConflict {
            resume_id: resume_id.to_string(),
        });
    }

    // Dispatch: queued when a queue is configured, inline otherwise. The
    // worker's claim transition stays the one concurrency guard either way.
    match &state.queues.enhancement {
        Some(queue) => {
            queue
                .send(&EnhancementJobMessage {
                    resume_id,
                    owner_id,
                })
                .await?;
        }
        None => {
            let pipeline = state.enhancement.clone();
            tokio::spawn(async move {
                if let Err(e) = pipeline.enhance(resume_id).await {
                    tracing::error!(resume_id = %resume_id, error = %e, "Inline enhancement failed");
                }
            });
        }
    }

    tracing::info!(resume_id = %resume_id, owner_id = %owner_id, "Enhancement queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(StartEnhancementResponse {
            resume_id,
            status: "queued".to_string(),
            poll_url: format!("/v1/resumes/{}/enhancement", resume_id),
        }),
    ))
}

/// Get the enhancement state for a resume, with the report once completed
pub async fn get_enhancement(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<EnhancementStatusResponse>> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;

    let report = if resume.enhancement_state() == EnhancementState::Completed {
        Some(pitchforge_enhancement::build_report(&resume)?)
    } else {
        None
    };

    Ok(Json(EnhancementStatusResponse {
        resume_id,
        status: resume.enhancement_status,
        started_at: resume.enhancement_started_at.map(|dt| dt.to_rfc3339()),
        completed_at: resume.enhancement_completed_at.map(|dt| dt.to_rfc3339()),
        error: resume.enhancement_error,
        report,
    }))
}

/// Get the improvement report for a completed enhancement
pub async fn get_report(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<EnhancementSummary>> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;

    if resume.enhancement_state() != EnhancementState::Completed {
        return Err(AppError::NotFound {
            resource_type: "enhancement report".to_string(),
            id: resume_id.to_string(),
        });
    }

    Ok(Json(pitchforge_enhancement::build_report(&resume)?))
}

/// List enhancement events for a resume, oldest first
pub async fn list_events(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<Vec<EnhancementEventResponse>>> {
    // Ownership check before exposing the event stream
    state.repository.find_owned_resume(resume_id, owner_id).await?;

    let events = state.repository.events_for_resume(resume_id).await?;

    Ok(Json(
        events
            .into_iter()
            .map(|e| EnhancementEventResponse {
                event_type: e.event_type,
                stage: e.stage,
                progress: e.progress,
                message: e.message,
                details: e.details,
                created_at: e.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}
