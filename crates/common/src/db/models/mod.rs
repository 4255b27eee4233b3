//! SeaORM entity models
//!
//! Database entities for PitchForge

mod answer_cache;
mod chunk;
mod enhancement_event;
mod generation_record;
mod resume;

pub use resume::{
    Entity as ResumeEntity,
    Model as Resume,
    ActiveModel as ResumeActiveModel,
    Column as ResumeColumn,
    EnhancementState,
    ResumeStatus,
};

pub use chunk::{
    Entity as ChunkEntity,
    Model as ResumeChunk,
    ActiveModel as ChunkActiveModel,
    Column as ChunkColumn,
};

pub use generation_record::{
    Entity as GenerationRecordEntity,
    Model as GenerationRecord,
    ActiveModel as GenerationRecordActiveModel,
    Column as GenerationRecordColumn,
    GenerationStatus,
};

pub use answer_cache::{
    Entity as AnswerCacheEntity,
    Model as CachedAnswer,
    ActiveModel as AnswerCacheActiveModel,
    Column as AnswerCacheColumn,
};

pub use enhancement_event::{
    Entity as EnhancementEventEntity,
    Model as EnhancementEvent,
    ActiveModel as EnhancementEventActiveModel,
    Column as EnhancementEventColumn,
    EventType,
};
