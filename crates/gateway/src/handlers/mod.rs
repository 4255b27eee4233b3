//! Request handlers

pub mod answers;
pub mod enhancements;
pub mod health;
pub mod proposals;
pub mod resumes;

use axum::{extract::FromRequestParts, http::request::Parts};
use pitchforge_common::errors::AppError;
use uuid::Uuid;

/// Owner identity extracted from the X-Owner-ID header
///
/// Upstream auth terminates before this service; the header carries the
/// already-verified owner id.
#[derive(Debug, Clone, Copy)]
pub struct OwnerId(pub Uuid);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-owner-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::MissingField {
                field: "X-Owner-ID header".to_string(),
            })?;

        let owner_id = Uuid::parse_str(header).map_err(|_| AppError::InvalidFormat {
            message: "X-Owner-ID header is not a valid UUID".to_string(),
        })?;

        Ok(OwnerId(owner_id))
    }
}
