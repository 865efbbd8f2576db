//! Learning-plan generation subsystem.
//!
//! # Data Flow
//! ```text
//! LearningRequest
//!     → engine (validate, decompose topic into weekly subtopics)
//!     → pipeline × N, bounded pool (search → sanity check → re-query → curate)
//!     → engine (collect, sort by week)
//!     → LearningPlanResponse
//! ```

pub mod curation;
pub mod engine;
pub mod pipeline;
pub mod prompts;
pub mod types;

pub use engine::PlanEngine;
pub use pipeline::{enrich_subtopic, PipelineContext, SubtopicUnit};
pub use types::{
    LearningModule, LearningPlanResponse, LearningRequest, PlanError, Resource, ResourceKind,
    SavePlanRequest, SavePlanResponse, SavedPlan, SubtopicOutcome,
};
