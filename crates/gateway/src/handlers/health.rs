//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub database: CheckResult,
    /// Which async workers have a queue wired up; empty means inline mode
    pub queues: Vec<String>,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: pitchforge_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks the database and reports queue wiring
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let database = match state.repository.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let mut queues = Vec::new();
    if state.queues.ingestion.is_some() {
        queues.push("ingestion".to_string());
    }
    if state.queues.proposal.is_some() {
        queues.push("proposal".to_string());
    }
    if state.queues.enhancement.is_some() {
        queues.push("enhancement".to_string());
    }

    let status = if database.status == "up" {
        "ready"
    } else {
        "not_ready"
    };

    Json(ReadyResponse {
        status: status.to_string(),
        database,
        queues,
    })
}
