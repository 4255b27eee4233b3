//! Resume management handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::OwnerId;
use crate::AppState;
use pitchforge_common::{
    db::models::Resume,
    errors::{AppError, Result},
    queue::IngestionJobMessage,
};
use pitchforge_enhancement::events::log_download;

const ALLOWED_FILE_TYPES: &[&str] = &["pdf", "doc", "docx", "txt"];

/// Resume summary returned by list and upload endpoints
#[derive(Serialize)]
pub struct ResumeResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub byte_size: i64,
    pub status: String,
    pub is_default: bool,
    pub enhancement_status: String,
    pub download_count: i32,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
}

impl From<Resume> for ResumeResponse {
    fn from(resume: Resume) -> Self {
        Self {
            id: resume.id,
            filename: resume.original_filename,
            file_type: resume.file_type,
            byte_size: resume.byte_size,
            status: resume.status,
            is_default: resume.is_default,
            enhancement_status: resume.enhancement_status,
            download_count: resume.download_count,
            created_at: resume.created_at.to_rfc3339(),
            last_used_at: resume.last_used_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Detail response including chunk count
#[derive(Serialize)]
pub struct ResumeDetailResponse {
    #[serde(flatten)]
    pub resume: ResumeResponse,
    pub chunk_count: i64,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub variant: Option<String>,
}

/// Upload a resume file and start async ingestion
pub async fn upload_resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeResponse>)> {
    let mut filename = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation {
            message: format!("Invalid multipart body: {}", e),
            field: None,
        })?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(String::from);
            bytes = Some(field.bytes().await.map_err(|e| AppError::Validation {
                message: format!("Failed to read file field: {}", e),
                field: Some("file".to_string()),
            })?);
        }
    }

    let filename = filename.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    let bytes = bytes.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;

    if bytes.is_empty() {
        return Err(AppError::Validation {
            message: "Uploaded file is empty".to_string(),
            field: Some("file".to_string()),
        });
    }

    let limit = state.config.server.max_upload_bytes;
    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }

    let file_type = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .filter(|ext| ALLOWED_FILE_TYPES.contains(&ext.as_str()))
        .ok_or_else(|| AppError::InvalidFormat {
            message: format!(
                "Unsupported file type, expected one of: {}",
                ALLOWED_FILE_TYPES.join(", ")
            ),
        })?;

    // Store the original file, then the metadata row
    let storage_path = state.blobs.store("resumes", &file_type, &bytes).await?;

    let resume = state
        .repository
        .create_resume(
            owner_id,
            storage_path,
            filename,
            file_type,
            bytes.len() as i64,
        )
        .await?;

    tracing::info!(
        resume_id = %resume.id,
        owner_id = %owner_id,
        byte_size = resume.byte_size,
        "Resume uploaded"
    );

    // Dispatch ingestion: queued when a queue is configured, inline otherwise
    match &state.queues.ingestion {
        Some(queue) => {
            queue
                .send(&IngestionJobMessage {
                    resume_id: resume.id,
                    owner_id,
                })
                .await?;
        }
        None => {
            let processor = state.ingestion.clone();
            let resume_id = resume.id;
            tokio::spawn(async move {
                if let Err(e) = processor.process_resume(resume_id).await {
                    tracing::error!(resume_id = %resume_id, error = %e, "Inline ingestion failed");
                }
            });
        }
    }

    Ok((StatusCode::ACCEPTED, Json(resume.into())))
}

/// List the owner's resumes, newest first
pub async fn list_resumes(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<Vec<ResumeResponse>>> {
    let resumes = state.repository.list_resumes(owner_id).await?;
    Ok(Json(resumes.into_iter().map(Into::into).collect()))
}

/// Get a resume by ID
pub async fn get_resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<ResumeDetailResponse>> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;
    let chunks = state.repository.chunks_for_resume(resume_id).await?;

    Ok(Json(ResumeDetailResponse {
        resume: resume.into(),
        chunk_count: chunks.len() as i64,
    }))
}

/// Delete a resume, its chunks, and its stored files
pub async fn delete_resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;

    // Blob deletes are best-effort; the row delete is the source of truth
    if let Err(e) = state.blobs.delete(&resume.storage_path).await {
        tracing::warn!(resume_id = %resume_id, error = %e, "Failed to delete original blob");
    }
    if let Some(ref enhanced_path) = resume.enhanced_storage_path {
        if let Err(e) = state.blobs.delete(enhanced_path).await {
            tracing::warn!(resume_id = %resume_id, error = %e, "Failed to delete enhanced blob");
        }
    }

    state.repository.delete_resume(resume_id).await?;

    tracing::info!(resume_id = %resume_id, owner_id = %owner_id, "Resume deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Make a resume the owner's default
pub async fn set_default(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode> {
    // Ownership check before the update touches any rows
    state.repository.find_owned_resume(resume_id, owner_id).await?;
    state.repository.set_default_resume(owner_id, resume_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Download the original or enhanced resume document
pub async fn download_resume(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(resume_id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse> {
    let resume = state.repository.find_owned_resume(resume_id, owner_id).await?;

    let variant = query.variant.as_deref().unwrap_or("original");
    let (path, filename) = match variant {
        "original" => (resume.storage_path.clone(), resume.original_filename.clone()),
        "enhanced" => {
            let path = resume.enhanced_storage_path.clone().ok_or_else(|| {
                AppError::NotFound {
                    resource_type: "enhanced document".to_string(),
                    id: resume_id.to_string(),
                }
            })?;
            (path, format!("enhanced_{}", resume.original_filename))
        }
        other => {
            return Err(AppError::InvalidFormat {
                message: format!("Unknown variant '{}', expected original or enhanced", other),
            })
        }
    };

    let bytes = state.blobs.read(&path).await?;

    state.repository.record_download(resume_id).await?;
    if let Err(e) = log_download(&state.repository, resume_id, owner_id, variant).await {
        tracing::warn!(resume_id = %resume_id, error = %e, "Failed to log download event");
    }

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, bytes))
}
