//! Resume document entity with embedded enhancement state

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Resume processing status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl From<String> for ResumeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => ResumeStatus::Pending,
            "processing" => ResumeStatus::Processing,
            "ready" => ResumeStatus::Ready,
            "failed" => ResumeStatus::Failed,
            _ => ResumeStatus::Pending,
        }
    }
}

impl From<ResumeStatus> for String {
    fn from(status: ResumeStatus) -> Self {
        match status {
            ResumeStatus::Pending => "pending".to_string(),
            ResumeStatus::Processing => "processing".to_string(),
            ResumeStatus::Ready => "ready".to_string(),
            ResumeStatus::Failed => "failed".to_string(),
        }
    }
}

/// Enhancement sub-state embedded in the resume row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementState {
    None,
    Processing,
    Completed,
    Failed,
}

impl From<String> for EnhancementState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processing" => EnhancementState::Processing,
            "completed" => EnhancementState::Completed,
            "failed" => EnhancementState::Failed,
            _ => EnhancementState::None,
        }
    }
}

impl From<EnhancementState> for String {
    fn from(state: EnhancementState) -> Self {
        match state {
            EnhancementState::None => "none".to_string(),
            EnhancementState::Processing => "processing".to_string(),
            EnhancementState::Completed => "completed".to_string(),
            EnhancementState::Failed => "failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resumes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    /// Opaque blob-store reference for the uploaded file
    #[sea_orm(column_type = "Text")]
    pub storage_path: String,

    #[sea_orm(column_type = "Text")]
    pub original_filename: String,

    /// Detected file type: pdf, doc, docx, txt
    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    pub byte_size: i64,

    #[sea_orm(column_type = "Text", nullable)]
    pub extracted_text: Option<String>,

    /// pending | processing | ready | failed
    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// At most one default resume per owner
    pub is_default: bool,

    pub download_count: i32,

    pub last_used_at: Option<DateTimeWithTimeZone>,

    pub last_downloaded_at: Option<DateTimeWithTimeZone>,

    /// none | processing | completed | failed
    #[sea_orm(column_type = "Text")]
    pub enhancement_status: String,

    pub enhancement_started_at: Option<DateTimeWithTimeZone>,

    /// Only set when enhancement_status = completed
    pub enhancement_completed_at: Option<DateTimeWithTimeZone>,

    /// Only set when enhancement_status = failed
    #[sea_orm(column_type = "Text", nullable)]
    pub enhancement_error: Option<String>,

    /// Structured improvement report: scores before/after, applied changes
    #[sea_orm(column_type = "Json", nullable)]
    pub enhancement_results: Option<Json>,

    /// Blob-store reference for the rendered enhanced document
    #[sea_orm(column_type = "Text", nullable)]
    pub enhanced_storage_path: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chunk::Entity")]
    Chunks,
}

impl Related<super::chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Get the processing status as an enum
    pub fn resume_status(&self) -> ResumeStatus {
        ResumeStatus::from(self.status.clone())
    }

    /// Get the enhancement state as an enum
    pub fn enhancement_state(&self) -> EnhancementState {
        EnhancementState::from(self.enhancement_status.clone())
    }

    /// Check whether an enhancement run is currently in flight
    pub fn enhancement_in_flight(&self) -> bool {
        self.enhancement_state() == EnhancementState::Processing
    }

    /// Processing duration of the last completed enhancement, in seconds
    pub fn enhancement_duration_secs(&self) -> Option<i64> {
        match (self.enhancement_started_at, self.enhancement_completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ResumeStatus::from(String::from(ResumeStatus::Ready)), ResumeStatus::Ready);
        assert_eq!(
            EnhancementState::from(String::from(EnhancementState::Processing)),
            EnhancementState::Processing
        );
    }

    #[test]
    fn test_unknown_enhancement_state_defaults_to_none() {
        assert_eq!(EnhancementState::from("garbage".to_string()), EnhancementState::None);
    }
}
