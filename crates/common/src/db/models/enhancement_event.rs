//! Append-only enhancement event log
//!
//! Every pipeline stage transition and download action is persisted here so
//! progress is observable by polling and the final report can cite events.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of logged event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Started,
    Stage,
    Completed,
    Failed,
    Download,
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "started" => EventType::Started,
            "stage" => EventType::Stage,
            "completed" => EventType::Completed,
            "failed" => EventType::Failed,
            "download" => EventType::Download,
            _ => EventType::Stage,
        }
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Started => "started".to_string(),
            EventType::Stage => "stage".to_string(),
            EventType::Completed => "completed".to_string(),
            EventType::Failed => "failed".to_string(),
            EventType::Download => "download".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enhancement_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub resume_id: Uuid,

    pub owner_id: Uuid,

    /// started | stage | completed | failed | download
    #[sea_orm(column_type = "Text")]
    pub event_type: String,

    /// Stage name for stage events, e.g. "keyword_extraction"
    #[sea_orm(column_type = "Text", nullable)]
    pub stage: Option<String>,

    /// Progress percentage, 0..=100
    pub progress: i32,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Structured technical sub-details for the stage
    #[sea_orm(column_type = "Json", nullable)]
    pub details: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::resume::Entity",
        from = "Column::ResumeId",
        to = "super::resume::Column::Id",
        on_delete = "Cascade"
    )]
    Resume,
}

impl Related<super::resume::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resume.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
