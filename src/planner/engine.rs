//! Plan generation, saving and listing.
//!
//! # Responsibilities
//! - Validate incoming requests
//! - Decompose a topic into weekly subtopics
//! - Fan subtopics out to a bounded worker pool and collect the weeks
//! - Persist plans and read them back
//!
//! # Design Decisions
//! - Clients are fetched from the registry per call so a server started
//!   without secrets recovers once they are set
//! - Each unit has its own deadline; a slow week never holds the plan hostage

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};

use crate::config::AppConfig;
use crate::observability::metrics;
use crate::planner::curation;
use crate::planner::pipeline::{enrich_subtopic, PipelineContext, SubtopicUnit};
use crate::planner::prompts;
use crate::planner::types::{
    LearningModule, LearningPlanResponse, LearningRequest, PlanError, SavePlanRequest,
    SavePlanResponse, SavedPlan, SubtopicOutcome,
};
use crate::resilience::RetryPolicy;
use crate::upstream::llm::ResponseMode;
use crate::upstream::registry::ServiceRegistry;
use crate::upstream::store::{PlanDocument, StoredDocument};
use crate::upstream::types::Service;

const MAX_TOPIC_CHARS: usize = 200;
const MAX_HOURS_PER_WEEK: u32 = 168;

/// Orchestrates the planning pipeline against the configured services.
#[derive(Clone)]
pub struct PlanEngine {
    config: Arc<AppConfig>,
    registry: Arc<ServiceRegistry>,
    retry: RetryPolicy,
}

impl PlanEngine {
    pub fn new(config: Arc<AppConfig>, registry: Arc<ServiceRegistry>) -> Self {
        let retry = RetryPolicy::new(
            config.retries.clone(),
            Duration::from_secs(config.timeouts.upstream_secs),
        );
        Self {
            config,
            registry,
            retry,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Build a full plan for `request`.
    pub async fn generate(&self, request: &LearningRequest) -> Result<LearningPlanResponse, PlanError> {
        self.validate_learning_request(request)?;
        let services = self.registry.get().await?;
        let planner = &self.config.planner;
        let topic = request.topic.trim();

        tracing::info!(
            topic = %topic,
            hours_per_week = request.hours_per_week,
            format = %request.preferred_format,
            "Generating plan"
        );

        let prompt = prompts::decomposition(topic, planner.weeks);
        let llm = services.llm.clone();
        let answer = self
            .retry
            .run(Service::Llm, "decompose", || llm.generate(&prompt, ResponseMode::Text))
            .await?;

        let subtopics = curation::parse_subtopics(&answer, planner.weeks);
        if subtopics.is_empty() {
            return Err(PlanError::EmptyDecomposition(topic.to_string()));
        }
        tracing::info!(count = subtopics.len(), subtopics = ?subtopics, "Topic decomposed");

        let ctx = PipelineContext::new(services.llm, services.search, self.retry.clone(), planner);
        let deadline = Duration::from_secs(planner.subtopic_timeout_secs);
        let units: Vec<SubtopicUnit> = subtopics
            .into_iter()
            .enumerate()
            .map(|(i, subtopic)| SubtopicUnit {
                week: i as u32 + 1,
                topic: topic.to_string(),
                subtopic,
            })
            .collect();

        let mut modules: Vec<LearningModule> = stream::iter(units)
            .map(|unit| {
                let ctx = &ctx;
                async move {
                    match tokio::time::timeout(deadline, enrich_subtopic(ctx, &unit)).await {
                        Ok((module, _)) => module,
                        Err(_) => {
                            tracing::warn!(
                                week = unit.week,
                                subtopic = %unit.subtopic,
                                timeout_secs = deadline.as_secs(),
                                "Subtopic deadline elapsed"
                            );
                            metrics::record_subtopic(SubtopicOutcome::Failed.as_str());
                            LearningModule::empty(unit.week, unit.subtopic.clone())
                        }
                    }
                }
            })
            .buffer_unordered(planner.max_concurrency.max(1))
            .collect()
            .await;

        modules.sort_by_key(|m| m.week);

        Ok(LearningPlanResponse {
            plan_title: format!("Your Curated Plan for {}", request.topic),
            modules,
        })
    }

    /// Persist a plan.
    pub async fn save(&self, request: &SavePlanRequest) -> Result<SavePlanResponse, PlanError> {
        if request.user_id.trim().is_empty() {
            return Err(PlanError::InvalidRequest("userId must not be empty".into()));
        }
        if request.plan_title.trim().is_empty() {
            return Err(PlanError::InvalidRequest("planTitle must not be empty".into()));
        }

        let services = self.registry.get().await?;
        let document = PlanDocument {
            plan_title: request.plan_title.clone(),
            modules: serde_json::to_string(&request.modules)?,
            user_id: request.user_id.clone(),
        };

        let store = services.store;
        let id = self
            .retry
            .run(Service::Store, "create_document", || store.create(document.clone()))
            .await?;

        tracing::info!(id = %id, user_id = %request.user_id, "Plan saved");
        metrics::record_plan_saved();

        Ok(SavePlanResponse {
            success: true,
            error: None,
        })
    }

    /// All plans saved by `user_id`.
    pub async fn list(&self, user_id: &str) -> Result<Vec<SavedPlan>, PlanError> {
        if user_id.trim().is_empty() {
            return Err(PlanError::InvalidRequest("userId must not be empty".into()));
        }

        let services = self.registry.get().await?;
        let store = services.store;
        let documents = self
            .retry
            .run(Service::Store, "list_documents", || store.list_by_user(user_id))
            .await?;

        tracing::info!(user_id = %user_id, count = documents.len(), "Plans fetched");
        Ok(documents.into_iter().map(into_saved_plan).collect())
    }

    fn validate_learning_request(&self, request: &LearningRequest) -> Result<(), PlanError> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(PlanError::InvalidRequest("Topic must not be empty".into()));
        }
        if !self.config.security.strict_validation {
            return Ok(());
        }
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(PlanError::InvalidRequest(format!(
                "Topic must be at most {MAX_TOPIC_CHARS} characters"
            )));
        }
        if !(1..=MAX_HOURS_PER_WEEK).contains(&request.hours_per_week) {
            return Err(PlanError::InvalidRequest(format!(
                "hours_per_week must be between 1 and {MAX_HOURS_PER_WEEK}"
            )));
        }
        Ok(())
    }
}

fn into_saved_plan(doc: StoredDocument) -> SavedPlan {
    let modules = match serde_json::from_str::<Vec<serde_json::Value>>(&doc.document.modules) {
        Ok(modules) => modules,
        Err(e) => {
            tracing::warn!(id = %doc.id, error = %e, "Stored modules are not valid JSON");
            Vec::new()
        }
    };

    SavedPlan {
        id: doc.id,
        user_id: doc.document.user_id,
        plan_title: doc.document.plan_title,
        modules,
        created_at: doc.created_at,
    }
}
