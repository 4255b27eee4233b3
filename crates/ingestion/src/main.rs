//! PitchForge Ingestion Worker
//!
//! Processes ingestion jobs from SQS:
//! 1. Receives a resume id from the queue
//! 2. Reads the stored file and extracts text
//! 3. Chunks, embeds, and writes chunks to the vector store

use pitchforge_ingestion::IngestionProcessor;

use pitchforge_common::{
    blob::FsBlobStore,
    config::AppConfig,
    db::{DbPool, Repository},
    embeddings::create_embedder,
    queue::{IngestionJobMessage, Queue, QueueSettings},
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

    info!("Starting PitchForge Ingestion Worker v{}", VERSION);

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

    // Initialize embedder
    let embedder = create_embedder(
        &config.embedding.provider,
        config.embedding.api_key.clone(),
        Some(config.embedding.model.clone()),
        config.embedding.api_base.clone(),
    )?;

    info!(
        model = %embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder initialized"
    );

    let blobs = Arc::new(FsBlobStore::new(config.blob.root.clone()));

    let processor = IngestionProcessor::new(
        repository.clone(),
        blobs,
        embedder,
        Arc::new(repository),
        config.embedding.concurrency,
    );

    // Initialize ingestion queue
    let queue_url = match config.queue.ingestion_queue_url.clone() {
        Some(url) => url,
        None => {
            warn!("Ingestion queue URL not set, waiting for shutdown signal...");
            tokio::signal::ctrl_c().await?;
            info!("Ingestion worker shutting down");
            return Ok(());
        }
    };

    info!(url = %queue_url, "Connecting to ingestion queue...");
    let queue = Queue::new(QueueSettings {
        url: queue_url,
        dlq_url: config.queue.dlq_url.clone(),
        ..Default::default()
    })
    .await?;

    info!("Ingestion worker ready, starting queue polling...");

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
                            let job: IngestionJobMessage = match Queue::parse_message(&message) {
                                Ok(job) => job,
                                Err(e) => {
                                    error!(error = %e, "Failed to parse ingestion message");
                                    if let Some(handle) = message.receipt_handle() {
                                        let _ = queue.delete(handle).await;
                                    }
                                    continue;
                                }
                            };

                            info!(resume_id = %job.resume_id, "Received ingestion job");

                            match processor.process_resume(job.resume_id).await {
                                Ok(outcome) => {
                                    consecutive_failures = 0;
                                    info!(
                                        resume_id = %job.resume_id,
                                        chunks_stored = outcome.chunks_stored,
                                        chunks_skipped = outcome.chunks_skipped,
                                        "Ingestion job complete"
                                    );
                                    if let Some(handle) = message.receipt_handle() {
                                        if let Err(e) = queue.delete(handle).await {
                                            error!(error = %e, "Failed to delete message");
                                        }
                                    }
                                }
                                Err(e) => {
                                    consecutive_failures += 1;
                                    error!(
                                        resume_id = %job.resume_id,
                                        error = %e,
                                        failures = consecutive_failures,
                                        "Failed to process ingestion job"
                                    );
                                    // Message will be re-delivered or moved to DLQ
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

    info!("Ingestion worker shutting down");
    Ok(())
}
