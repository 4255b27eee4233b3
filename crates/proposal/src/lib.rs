//! PitchForge Proposal Library
//!
//! Turns a job posting into a personalized proposal:
//! 1. Retrieve the owner's most relevant resume chunks
//! 2. Assemble a grounded prompt from job, snippets, profile, and portfolio
//! 3. Call the generation model and persist the outcome with usage and cost

pub mod orchestrator;
pub mod prompt;
pub mod retrieval;
pub mod types;

pub use orchestrator::{ProposalOrchestrator, ProposalStore};
pub use retrieval::{RetrievalService, Snippet};
