//! Error types for PitchForge services
//!
//! One error enum for the whole pipeline, with:
//! - Distinct variants for recoverable vs. fatal failure modes
//! - Machine-readable error codes for client handling
//! - HTTP status code mapping and structured responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    PayloadTooLarge,

    // Resource errors (4xxx)
    NotFound,
    ResumeNotFound,
    GenerationRecordNotFound,

    // Conflict errors (5xxx)
    Conflict,
    EnhancementInFlight,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Pipeline / external service errors (8xxx)
    ExtractionError,
    EmbeddingError,
    RetrievalError,
    GenerationError,
    GenerationTimeout,
    EnhancementFailed,
    QueueError,
    BlobError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,

    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ResumeNotFound => 4002,
            ErrorCode::GenerationRecordNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::EnhancementInFlight => 5002,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Pipeline / external (8xxx)
            ErrorCode::ExtractionError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::RetrievalError => 8003,
            ErrorCode::GenerationError => 8004,
            ErrorCode::GenerationTimeout => 8005,
            ErrorCode::EnhancementFailed => 8006,
            ErrorCode::QueueError => 8007,
            ErrorCode::BlobError => 8008,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
///
/// The pipeline distinguishes locally-recoverable conditions (a missing
/// rich-text parser, one chunk failing to embed) from fatal ones (query
/// embedding failure, generation failure) via distinct variants rather than
/// one catch-all exception.
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Resume not found: {id}")]
    ResumeNotFound { id: String },

    #[error("Generation record not found for correlation id {correlation_id}")]
    GenerationRecordNotFound { correlation_id: String },

    // Conflict errors
    #[error("Enhancement already in progress for resume {resume_id}")]
    StateConflict { resume_id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Pipeline errors
    /// Recoverable: ingestion continues with a placeholder text.
    #[error("Text extraction failed for {file_type}: {message}")]
    Extraction { file_type: String, message: String },

    /// Recoverable per chunk: the chunk is skipped and ingestion continues.
    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    /// Fatal for the generation attempt: no grounded prompt without a
    /// retrieval pass.
    #[error("Retrieval failed: {message}")]
    Retrieval { message: String },

    /// Fatal for the attempt; retryable in the queued path.
    #[error("Generation failed: {message}")]
    Generation { message: String },

    #[error("Generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    /// Terminal for one enhancement run; the user must re-trigger.
    #[error("Enhancement failed: {message}")]
    EnhancementFailed { message: String },

    #[error("Queue error: {message}")]
    QueueError { message: String },

    #[error("Blob storage error: {message}")]
    BlobError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ResumeNotFound { .. } => ErrorCode::ResumeNotFound,
            AppError::GenerationRecordNotFound { .. } => ErrorCode::GenerationRecordNotFound,
            AppError::StateConflict { .. } => ErrorCode::EnhancementInFlight,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Extraction { .. } => ErrorCode::ExtractionError,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::Retrieval { .. } => ErrorCode::RetrievalError,
            AppError::Generation { .. } => ErrorCode::GenerationError,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::EnhancementFailed { .. } => ErrorCode::EnhancementFailed,
            AppError::QueueError { .. } => ErrorCode::QueueError,
            AppError::BlobError { .. } => ErrorCode::BlobError,
            AppError::HttpClient(_) => ErrorCode::GenerationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::ResumeNotFound { .. }
            | AppError::GenerationRecordNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::StateConflict { .. } => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Extraction { .. }
            | AppError::EnhancementFailed { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Embedding { .. }
            | AppError::Retrieval { .. }
            | AppError::Generation { .. }
            | AppError::GenerationTimeout { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::QueueError { .. }
            | AppError::BlobError { .. }
            | AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for the API
///
/// Callers never see raw stack traces, only a diagnostic message and code.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
                request_id: None, // filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ResumeNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::ResumeNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_state_conflict_is_409() {
        let err = AppError::StateConflict {
            resume_id: "abc".into(),
        };
        assert_eq!(err.code(), ErrorCode::EnhancementInFlight);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_retrieval_error_is_upstream() {
        let err = AppError::Retrieval {
            message: "query embedding failed".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Invalid filename".into(),
            field: Some("filename".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }
}
