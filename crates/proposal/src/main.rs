//! PitchForge Proposal Worker
//!
//! Consumes queued proposal jobs from SQS. Each job runs the shared
//! orchestrator pipeline with bounded retries: up to the configured number of
//! attempts, each under a per-attempt timeout, and each attempt writing its
//! own generation record under the job's correlation id.

use pitchforge_proposal::types::ProposalRequest;
use pitchforge_proposal::{ProposalOrchestrator, RetrievalService};

use pitchforge_common::{
    config::AppConfig,
    db::models::GenerationStatus,
    db::{DbPool, Repository},
    embeddings::create_embedder,
    errors::AppError,
    generation::{create_generator, GeneratorConfig},
    queue::{ProposalJobMessage, Queue, QueueSettings},
    VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting PitchForge Proposal Worker v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Repository::new(db);

    // Initialize embedder and generator
    let embedder = create_embedder(
        &config.embedding.provider,
        config.embedding.api_key.clone(),
        Some(config.embedding.model.clone()),
        config.embedding.api_base.clone(),
    )?;

    let generator = create_generator(
        &config.generation.provider,
        GeneratorConfig::from_app(&config.generation),
    )?;

    info!(model = %generator.model_name(), "Generator initialized");

    let retrieval = RetrievalService::new(embedder, Arc::new(repository.clone()));
    let orchestrator = Arc::new(ProposalOrchestrator::new(
        repository,
        retrieval,
        generator,
        config.generation.retrieval_k,
    ));

    // Initialize proposal queue
    let queue_url = match config.queue.proposal_queue_url.clone() {
        Some(url) => url,
        None => {
            warn!("Proposal queue URL not set, waiting for shutdown signal...");
            tokio::signal::ctrl_c().await?;
            info!("Proposal worker shutting down");
            return Ok(());
        }
    };

    info!(url = %queue_url, "Connecting to proposal queue...");
    let queue = Queue::new(QueueSettings {
        url: queue_url,
        dlq_url: config.queue.dlq_url.clone(),
        // Jobs can run up to max_attempts * attempt_timeout, keep the
        // message invisible for the whole window
        visibility_timeout: (config.generation.max_attempts as i32)
            * (config.generation.attempt_timeout_secs as i32)
            + 30,
        ..Default::default()
    })
    .await?;

    let attempt_timeout = config.attempt_timeout();
    let max_attempts = config.generation.max_attempts.max(1);

    info!("Proposal worker ready, starting queue polling...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            result = queue.receive() => {
                match result {
                    Ok(messages) => {
                        for message in messages {
                            let job: ProposalJobMessage = match Queue::parse_message(&message) {
                                Ok(job) => job,
                                Err(e) => {
                                    error!(error = %e, "Failed to parse proposal message");
                                    if let Some(handle) = message.receipt_handle() {
                                        let _ = queue.delete(handle).await;
                                    }
                                    continue;
                                }
                            };

                            run_job(&orchestrator, &job, max_attempts, attempt_timeout).await;

                            // Terminal either way: the outcome is recorded
                            if let Some(handle) = message.receipt_handle() {
                                if let Err(e) = queue.delete(handle).await {
                                    error!(error = %e, "Failed to delete message");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to receive messages from queue");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    info!("Proposal worker shutting down");
    Ok(())
}

/// Run one queued job with bounded retries
///
/// Each attempt writes its own generation record. A timed-out attempt is
/// recorded as failed like any other pipeline error.
async fn run_job(
    orchestrator: &ProposalOrchestrator<Repository>,
    job: &ProposalJobMessage,
    max_attempts: u32,
    attempt_timeout: Duration,
) {
    let request: ProposalRequest = match serde_json::from_value(job.payload.clone()) {
        Ok(request) => request,
        Err(e) => {
            error!(
                correlation_id = %job.correlation_id,
                error = %e,
                "Invalid proposal payload, dropping job"
            );
            return;
        }
    };

    for attempt in 1..=max_attempts {
        info!(
            correlation_id = %job.correlation_id,
            attempt,
            max_attempts,
            "Starting generation attempt"
        );

        let result = tokio::time::timeout(
            attempt_timeout,
            orchestrator.generate_proposal(job.owner_id, job.correlation_id, &request),
        )
        .await;

        match result {
            Ok(Ok(record)) => {
                debug_assert_eq!(record.generation_status(), GenerationStatus::Success);
                info!(
                    correlation_id = %job.correlation_id,
                    attempt,
                    "Proposal job complete"
                );
                return;
            }
            Ok(Err(e)) => {
                warn!(
                    correlation_id = %job.correlation_id,
                    attempt,
                    error = %e,
                    "Generation attempt failed"
                );
            }
            Err(_) => {
                let e = AppError::GenerationTimeout {
                    timeout_secs: attempt_timeout.as_secs(),
                };
                warn!(
                    correlation_id = %job.correlation_id,
                    attempt,
                    error = %e,
                    "Generation attempt timed out"
                );
                // The orchestrator never returned, so record the timeout as
                // this attempt's terminal outcome
                record_timeout(orchestrator, job, &request, &e).await;
            }
        }
    }

    error!(
        correlation_id = %job.correlation_id,
        max_attempts,
        "Proposal job exhausted all attempts"
    );
}

async fn record_timeout(
    orchestrator: &ProposalOrchestrator<Repository>,
    job: &ProposalJobMessage,
    request: &ProposalRequest,
    err: &AppError,
) {
    if let Err(e) = orchestrator
        .record_failed_attempt(job.owner_id, job.correlation_id, request, err)
        .await
    {
        error!(
            correlation_id = %job.correlation_id,
            error = %e,
            "Failed to persist timed-out attempt"
        );
    }
}
