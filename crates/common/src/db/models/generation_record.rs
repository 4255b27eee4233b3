//! Generation record entity: one proposal-generation attempt
//!
//! Written exactly once, at the terminal outcome. Retries in the queued path
//! are new rows sharing the correlation id; callers aggregate by latest
//! record per correlation id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Terminal status of a generation attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    Failed,
}

impl From<String> for GenerationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => GenerationStatus::Success,
            _ => GenerationStatus::Failed,
        }
    }
}

impl From<GenerationStatus> for String {
    fn from(status: GenerationStatus) -> Self {
        match status {
            GenerationStatus::Success => "success".to_string(),
            GenerationStatus::Failed => "failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generation_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    /// Ties all attempts for one requested proposal together
    pub correlation_id: Uuid,

    /// Verbatim job payload the proposal was generated for
    #[sea_orm(column_type = "Json")]
    pub job_payload: Json,

    /// Generated proposal text on success, diagnostic message on failure
    #[sea_orm(column_type = "Text", nullable)]
    pub output_text: Option<String>,

    /// Zero on failure
    pub input_tokens: i32,

    /// Zero on failure
    pub output_tokens: i32,

    /// Estimated cost in USD from the fixed price table
    #[sea_orm(column_type = "Double")]
    pub cost_usd: f64,

    #[sea_orm(column_type = "Text")]
    pub model: String,

    /// success | failed
    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Get the terminal status as an enum
    pub fn generation_status(&self) -> GenerationStatus {
        GenerationStatus::from(self.status.clone())
    }
}
