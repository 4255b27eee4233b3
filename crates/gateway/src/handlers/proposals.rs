//! Proposal generation handlers
//!
//! The synchronous endpoint runs one pipeline attempt under the per-attempt
//! timeout. The queued endpoint hands the job to the proposal worker, which
//! owns the retry loop, and returns a correlation id for polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::OwnerId;
use crate::AppState;
use pitchforge_common::{
    db::models::GenerationRecord,
    errors::{AppError, Result},
    queue::ProposalJobMessage,
};
use pitchforge_proposal::types::ProposalRequest;

/// Response carrying a finished generation record
#[derive(Serialize)]
pub struct ProposalResponse {
    pub correlation_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub cost_usd: f64,
    pub model: String,
    pub created_at: String,
}

impl From<GenerationRecord> for ProposalResponse {
    fn from(record: GenerationRecord) -> Self {
        Self {
            correlation_id: record.correlation_id,
            status: record.status,
            proposal: record.output_text,
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            cost_usd: record.cost_usd,
            model: record.model,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Response after queueing a proposal job
#[derive(Serialize)]
pub struct QueuedProposalResponse {
    pub correlation_id: Uuid,
    pub status: String,
    pub poll_url: String,
}

/// Generate a proposal synchronously (single attempt)
pub async fn generate_proposal(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<ProposalRequest>,
) -> Result<Json<ProposalResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let correlation_id = Uuid::new_v4();
    let attempt_timeout = state.config.attempt_timeout();

    let record = match tokio::time::timeout(
        attempt_timeout,
        state
            .orchestrator
            .generate_proposal(owner_id, correlation_id, &request),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            // The pipeline future was cancelled, so the attempt still needs
            // its terminal record
            let timeout_err = AppError::GenerationTimeout {
                timeout_secs: attempt_timeout.as_secs(),
            };
            if let Err(e) = state
                .orchestrator
                .record_failed_attempt(owner_id, correlation_id, &request, &timeout_err)
                .await
            {
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Failed to persist timed-out generation record"
                );
            }
            return Err(timeout_err);
        }
    };

    mark_default_resume_used(&state, owner_id).await;

    Ok(Json(record.into()))
}

/// Queue a proposal job for the async worker
pub async fn queue_proposal(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<ProposalRequest>,
) -> Result<(StatusCode, Json<QueuedProposalResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let queue = state
        .queues
        .proposal
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable {
            message: "Proposal queue is not configured".to_string(),
        })?;

    let correlation_id = Uuid::new_v4();
    queue
        .send(&ProposalJobMessage {
            correlation_id,
            owner_id,
            payload: serde_json::to_value(&request)?,
        })
        .await?;

    tracing::info!(
        correlation_id = %correlation_id,
        owner_id = %owner_id,
        "Proposal job queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedProposalResponse {
            correlation_id,
            status: "queued".to_string(),
            poll_url: format!("/v1/proposals/{}", correlation_id),
        }),
    ))
}

/// Get the latest generation record for a correlation id
pub async fn get_proposal(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(correlation_id): Path<Uuid>,
) -> Result<Json<ProposalResponse>> {
    let record = state
        .repository
        .latest_record_by_correlation(owner_id, correlation_id)
        .await?
        .ok_or_else(|| AppError::GenerationRecordNotFound {
            correlation_id: correlation_id.to_string(),
        })?;

    Ok(Json(record.into()))
}

/// Touch the default resume's last-used timestamp, best-effort
async fn mark_default_resume_used(state: &AppState, owner_id: Uuid) {
    let resumes = match state.repository.list_resumes(owner_id).await {
        Ok(resumes) => resumes,
        Err(e) => {
            tracing::warn!(owner_id = %owner_id, error = %e, "Failed to list resumes");
            return;
        }
    };

    if let Some(default) = resumes.into_iter().find(|r| r.is_default) {
        if let Err(e) = state.repository.record_use(default.id).await {
            tracing::warn!(resume_id = %default.id, error = %e, "Failed to record resume use");
        }
    }
}
