//! Plan request and response types.
//!
//! Field names follow the JSON the web and Android clients already speak,
//! so some are camelCase and some snake_case.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::types::UpstreamError;

/// Request payload for generating a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRequest {
    /// Subject the learner wants to study.
    pub topic: String,
    pub hours_per_week: u32,
    /// e.g. "videos", "articles", "mixed".
    pub preferred_format: String,
    /// Absent when sent by the mobile client.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One curated learning resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One week of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningModule {
    pub week: u32,
    /// The subtopic studied that week.
    pub topic: String,
    pub resources: Vec<Resource>,
}

impl LearningModule {
    /// A week with no resources.
    pub fn empty(week: u32, topic: impl Into<String>) -> Self {
        Self {
            week,
            topic: topic.into(),
            resources: Vec::new(),
        }
    }
}

/// A generated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPlanResponse {
    pub plan_title: String,
    pub modules: Vec<LearningModule>,
}

/// Request payload for saving a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePlanRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "planTitle")]
    pub plan_title: String,
    /// Stored verbatim; clients send `LearningModule`-shaped objects.
    pub modules: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePlanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A plan read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "planTitle")]
    pub plan_title: String,
    pub modules: Vec<serde_json::Value>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Kind of resource, derived from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Video,
    Article,
}

impl ResourceKind {
    /// YouTube links are videos; everything else is read.
    pub fn classify(url: &str) -> Self {
        let host = url::Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

        match host.as_deref() {
            Some(h) => {
                let h = h
                    .strip_prefix("www.")
                    .or_else(|| h.strip_prefix("m."))
                    .unwrap_or(h);
                if h == "youtube.com" || h == "youtu.be" {
                    ResourceKind::Video
                } else {
                    ResourceKind::Article
                }
            }
            None => ResourceKind::Article,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Article => "article",
        }
    }
}

/// Errors from plan generation and persistence.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The request failed validation.
    #[error("{0}")]
    InvalidRequest(String),

    /// The model produced no usable subtopics.
    #[error("Could not break '{0}' into weekly sub-topics")]
    EmptyDecomposition(String),

    /// An upstream call failed after retries.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Modules could not be serialized for storage.
    #[error("Could not encode modules: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of one subtopic's enrichment, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtopicOutcome {
    /// The model picked the resources.
    Curated,
    /// Raw search hits were used after curation gave nothing.
    Fallback,
    /// Search found nothing.
    Empty,
    /// An error or deadline left the week without resources.
    Failed,
}

impl SubtopicOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtopicOutcome::Curated => "curated",
            SubtopicOutcome::Fallback => "fallback",
            SubtopicOutcome::Empty => "empty",
            SubtopicOutcome::Failed => "failed",
        }
    }
}
