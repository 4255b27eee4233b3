//! PitchForge Ingestion Library
//!
//! Turns an uploaded resume into searchable chunks:
//! 1. Extract plain text from the stored file
//! 2. Split into sentence-level chunks
//! 3. Embed each chunk and write it to the vector store

pub mod chunker;
pub mod extractor;
pub mod processor;

pub use processor::{IngestionProcessor, IngestionStore};
