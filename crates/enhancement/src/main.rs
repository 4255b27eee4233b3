//! PitchForge Enhancement Worker
//!
//! Processes enhancement jobs from SQS:
//! 1. Receives a resume id from the queue
//! 2. Claims the resume, rewrites it for ATS compatibility
//! 3. Renders the enhanced document and persists the improvement report

use pitchforge_enhancement::renderer::TextRenderer;
use pitchforge_enhancement::scorer::HeuristicScorer;
use pitchforge_enhancement::EnhancementPipeline;

use pitchforge_common::{
    blob::FsBlobStore,
    config::AppConfig,
    db::{DbPool, Repository},
    errors::AppError,
    generation::{create_generator, GeneratorConfig},
    queue::{EnhancementJobMessage, Queue, QueueSettings},
    VERSION,
};
use std::sync::Arc;
use tracing::{error, info, warn, Level};

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

    info!("Starting PitchForge Enhancement Worker v{}", VERSION);

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

    // Initialize generator
    let generator = create_generator(
        &config.generation.provider,
        GeneratorConfig::from_app(&config.generation),
    )?;

    info!(model = %generator.model_name(), "Generator initialized");

    let blobs = Arc::new(FsBlobStore::new(config.blob.root.clone()));

    let pipeline = EnhancementPipeline::new(
        repository,
        generator,
        Arc::new(TextRenderer),
        Arc::new(HeuristicScorer),
        blobs,
    );

    // Initialize enhancement queue
    let queue_url = match config.queue.enhancement_queue_url.clone() {
        Some(url) => url,
        None => {
            warn!("Enhancement queue URL not set, waiting for shutdown signal...");
            tokio::signal::ctrl_c().await?;
            info!("Enhancement worker shutting down");
            return Ok(());
        }
    };

    info!(url = %queue_url, "Connecting to enhancement queue...");
    let queue = Queue::new(QueueSettings {
        url: queue_url,
        dlq_url: config.queue.dlq_url.clone(),
        visibility_timeout: config.queue.visibility_timeout_secs as i32,
        ..Default::default()
    })
    .await?;

    info!("Enhancement worker ready, starting queue polling...");

    // Circuit breaker state
    let mut consecutive_failures = 0;
    const MAX_FAILURES: u32 = 5;
    const CIRCUIT_BREAK_DURATION: std::time::Duration = std::time::Duration::from_secs(30);

    loop {
        // Circuit breaker check
        if consecutive_failures >= MAX_FAILURES {
            warn!(
                failures = consecutive_failures,
                "Circuit breaker open, pausing..."
            );
            tokio::time::sleep(CIRCUIT_BREAK_DURATION).await;
            consecutive_failures = 0;
            info!("Circuit breaker reset, resuming...");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            result = queue.receive() => {
                match result {
                    Ok(messages) => {
                        for message in messages {
                            let job: EnhancementJobMessage = match Queue::parse_message(&message) {
                                Ok(job) => job,
                                Err(e) => {
                                    error!(error = %e, "Failed to parse enhancement message");
                                    if let Some(handle) = message.receipt_handle() {
                                        let _ = queue.delete(handle).await;
                                    }
                                    continue;
                                }
                            };

                            info!(resume_id = %job.resume_id, "Received enhancement job");

                            match pipeline.enhance(job.resume_id).await {
                                Ok(()) => {
                                    consecutive_failures = 0;
                                    info!(resume_id = %job.resume_id, "Enhancement job complete");
                                    if let Some(handle) = message.receipt_handle() {
                                        if let Err(e) = queue.delete(handle).await {
                                            error!(error = %e, "Failed to delete message");
                                        }
                                    }
                                }
                                Err(AppError::StateConflict { resume_id }) => {
                                    // Another worker already holds this resume
                                    info!(%resume_id, "Enhancement already in flight, dropping job");
                                    if let Some(handle) = message.receipt_handle() {
                                        let _ = queue.delete(handle).await;
                                    }
                                }
                                Err(e) => {
                                    consecutive_failures += 1;
                                    error!(
                                        resume_id = %job.resume_id,
                                        error = %e,
                                        failures = consecutive_failures,
                                        "Failed to process enhancement job"
                                    );
                                    // The failure is terminal on the resume row, so
                                    // redelivery would only hit the claim guard again
                                    if let Some(handle) = message.receipt_handle() {
                                        let _ = queue.delete(handle).await;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(error = %e, "Failed to receive messages from queue");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    info!("Enhancement worker shutting down");
    Ok(())
}
