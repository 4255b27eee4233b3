//! Screening-answer cache handlers
//!
//! Answers are keyed by a hash of the normalized question text, so the same
//! question phrased with different casing or trailing punctuation reuses the
//! stored answer.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handlers::OwnerId;
use crate::AppState;
use pitchforge_common::{
    db::question_hash,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertAnswerRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    #[validate(length(min = 1, max = 10000))]
    pub answer: String,
}

#[derive(Serialize)]
pub struct UpsertAnswerResponse {
    pub question_hash: String,
}

/// Store or replace a cached screening answer
pub async fn upsert_answer(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<UpsertAnswerRequest>,
) -> Result<(StatusCode, Json<UpsertAnswerResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let hash = question_hash(&request.question);

    state
        .repository
        .upsert_cached_answer(owner_id, &hash, &request.question, &request.answer)
        .await?;

    tracing::info!(owner_id = %owner_id, question_hash = %hash, "Screening answer cached");

    Ok((
        StatusCode::CREATED,
        Json(UpsertAnswerResponse {
            question_hash: hash,
        }),
    ))
}
