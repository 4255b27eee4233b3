//! PitchForge Common Library
//!
//! Shared code for all PitchForge services including:
//! - Database models and repository patterns
//! - Embedding and generation client abstractions
//! - Vector store trait with an in-memory implementation for tests
//! - Blob storage for uploaded and rendered documents
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod blob;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod metrics;
pub mod pricing;
pub mod queue;
pub mod vector;

// Re-export commonly used types
pub use blob::BlobStore;
pub use config::AppConfig;
pub use db::Repository;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use generation::Generator;
pub use vector::VectorStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
