//! Cached screening-question answers
//!
//! When a job posting repeats a screening question the freelancer has already
//! answered, the prompt assembler reuses the stored answer. Questions are
//! matched by a sha256 hash of the normalized question text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer_cache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    /// sha256 hex of the lowercased, whitespace-collapsed question
    #[sea_orm(column_type = "Text")]
    pub question_hash: String,

    #[sea_orm(column_type = "Text")]
    pub question_text: String,

    #[sea_orm(column_type = "Text")]
    pub answer_text: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
