//! PitchForge Enhancement Library
//!
//! Rewrites a resume into an ATS-optimized version through a fixed staged
//! pipeline, with every state transition and progress step persisted to an
//! append-only event log.

pub mod events;
pub mod pipeline;
pub mod renderer;
pub mod report;
pub mod scorer;
pub mod stages;

pub use pipeline::{EnhancementPipeline, EnhancementStore};
pub use report::build_report;
