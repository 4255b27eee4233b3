//! PitchForge API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Resume upload and management
//! - Proposal generation (synchronous and queued)
//! - Resume enhancement
//! - Rate limiting and observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use pitchforge_common::{
    blob::{BlobStore, FsBlobStore},
    config::AppConfig,
    db::{DbPool, Repository},
    embeddings::create_embedder,
    generation::{create_generator, GeneratorConfig},
    metrics,
    queue::{Queue, QueueSettings},
};
use pitchforge_enhancement::renderer::TextRenderer;
use pitchforge_enhancement::scorer::HeuristicScorer;
use pitchforge_enhancement::EnhancementPipeline;
use pitchforge_ingestion::IngestionProcessor;
use pitchforge_proposal::{ProposalOrchestrator, RetrievalService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Queue clients for the async workers, each optional
#[derive(Clone, Default)]
pub struct Queues {
    pub ingestion: Option<Arc<Queue>>,
    pub proposal: Option<Arc<Queue>>,
    pub enhancement: Option<Arc<Queue>>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub blobs: Arc<dyn BlobStore>,
    pub ingestion: Arc<IngestionProcessor<Repository>>,
    pub orchestrator: Arc<ProposalOrchestrator<Repository>>,
    pub enhancement: Arc<EnhancementPipeline<Repository>>,
    pub queues: Queues,
}

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

    info!("Starting PitchForge API Gateway v{}", pitchforge_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    metrics::register_metrics();
    info!("Metrics exporter listening on {}", metrics_addr);

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Repository::new(db);

    // Initialize blob storage
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob.root.clone()));

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

    // Inline pipelines, used when the matching queue is not configured
    let ingestion = Arc::new(IngestionProcessor::new(
        repository.clone(),
        blobs.clone(),
        embedder.clone(),
        Arc::new(repository.clone()),
        config.embedding.concurrency,
    ));

    let retrieval = RetrievalService::new(embedder.clone(), Arc::new(repository.clone()));
    let orchestrator = Arc::new(ProposalOrchestrator::new(
        repository.clone(),
        retrieval,
        generator.clone(),
        config.generation.retrieval_k,
    ));

    let enhancement = Arc::new(EnhancementPipeline::new(
        repository.clone(),
        generator,
        Arc::new(TextRenderer),
        Arc::new(HeuristicScorer),
        blobs.clone(),
    ));

    // Queue clients for async dispatch
    let queues = Queues {
        ingestion: connect_queue(&config, config.queue.ingestion_queue_url.clone()).await?,
        proposal: connect_queue(&config, config.queue.proposal_queue_url.clone()).await?,
        enhancement: connect_queue(&config, config.queue.enhancement_queue_url.clone()).await?,
    };

    // Create app state
    let state = AppState {
        config: config.clone(),
        repository,
        blobs,
        ingestion,
        orchestrator,
        enhancement,
        queues,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Build a queue client if a URL is configured
async fn connect_queue(
    config: &AppConfig,
    url: Option<String>,
) -> Result<Option<Arc<Queue>>, Box<dyn std::error::Error>> {
    match url {
        Some(url) => {
            info!(url = %url, "Connecting to queue...");
            let queue = Queue::new(QueueSettings {
                url,
                dlq_url: config.queue.dlq_url.clone(),
                visibility_timeout: config.queue.visibility_timeout_secs as i32,
                ..Default::default()
            })
            .await?;
            Ok(Some(Arc::new(queue)))
        }
        None => Ok(None),
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let max_upload = state.config.server.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Resume endpoints
        .route("/resumes", post(handlers::resumes::upload_resume))
        .route("/resumes", get(handlers::resumes::list_resumes))
        .route("/resumes/{id}", get(handlers::resumes::get_resume))
        .route("/resumes/{id}", delete(handlers::resumes::delete_resume))
        .route("/resumes/{id}/default", post(handlers::resumes::set_default))
        .route("/resumes/{id}/download", get(handlers::resumes::download_resume))
        // Proposal endpoints
        .route("/proposals", post(handlers::proposals::generate_proposal))
        .route("/proposals/queue", post(handlers::proposals::queue_proposal))
        .route("/proposals/{correlation_id}", get(handlers::proposals::get_proposal))
        // Enhancement endpoints
        .route("/resumes/{id}/enhance", post(handlers::enhancements::start_enhancement))
        .route("/resumes/{id}/enhancement", get(handlers::enhancements::get_enhancement))
        .route(
            "/resumes/{id}/enhancement/report",
            get(handlers::enhancements::get_report),
        )
        .route(
            "/resumes/{id}/enhancement/events",
            get(handlers::enhancements::list_events),
        )
        // Screening-answer cache endpoints
        .route("/answers", post(handlers::answers::upsert_answer));

    // Rate limiting (disabled via config for local development)
    let api_routes = if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        let limit = state.config.rate_limit.requests_per_second;
        api_routes.layer(axum::middleware::from_fn(move |request, next| {
            middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone(), limit)
        }))
    } else {
        api_routes
    };

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
