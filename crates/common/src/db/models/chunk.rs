//! Resume chunk entity with its embedding vector

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resume_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub resume_id: Uuid,

    /// Denormalized so nearest-neighbor queries filter by owner without a join
    pub owner_id: Uuid,

    /// Zero-based, contiguous within the parent resume
    pub chunk_index: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// pgvector embedding stored as text for SeaORM compatibility.
    /// Vector operations go through raw SQL with a ::vector cast.
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding: Option<String>,

    /// Embedding model identifier; dimensionality is fixed per model
    #[sea_orm(column_type = "Text")]
    pub embedding_model: String,

    /// Free-form origin tag, e.g. "resume"
    #[sea_orm(column_type = "Text")]
    pub source_type: String,

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

impl Model {
    /// Parse embedding from stored text format to Vec<f32>
    pub fn parse_embedding(&self) -> Option<Vec<f32>> {
        self.embedding.as_ref().and_then(|s| {
            // Format: "[1.0,2.0,3.0,...]"
            let inner = s.trim_start_matches('[').trim_end_matches(']');
            inner
                .split(',')
                .map(|v| v.trim().parse::<f32>().ok())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_embedding() {
        let chunk = Model {
            id: Uuid::new_v4(),
            resume_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            chunk_index: 0,
            content: "Shipped a payments platform".to_string(),
            embedding: Some("[0.5,-1.25,3]".to_string()),
            embedding_model: "text-embedding-3-small".to_string(),
            source_type: "resume".to_string(),
            created_at: Utc::now().into(),
        };
        assert_eq!(chunk.parse_embedding(), Some(vec![0.5, -1.25, 3.0]));
    }
}
