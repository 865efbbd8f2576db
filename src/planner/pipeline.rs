//! Per-subtopic enrichment: search, sanity check, optional re-query, curation.
//!
//! # Responsibilities
//! - Turn one weekly subtopic into a `LearningModule`
//! - Route every upstream call through the retry policy
//! - Degrade to raw hits or an empty week instead of failing the plan
//!
//! # Design Decisions
//! - Only the initial search is fatal for a unit; later steps keep the
//!   hits they already have when they fail
//! - The re-query happens at most once

use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::observability::metrics;
use crate::planner::curation::{self, Verdict};
use crate::planner::prompts;
use crate::planner::types::{LearningModule, Resource, SubtopicOutcome};
use crate::resilience::RetryPolicy;
use crate::upstream::llm::{LanguageModel, ResponseMode};
use crate::upstream::search::{SearchHit, SearchProvider};
use crate::upstream::types::{Service, UpstreamResult};

/// Everything a worker needs to enrich one subtopic.
#[derive(Clone)]
pub struct PipelineContext {
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchProvider>,
    pub retry: RetryPolicy,
    pub max_search_results: usize,
    pub picks: usize,
    pub self_correction: bool,
}

impl PipelineContext {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        retry: RetryPolicy,
        planner: &PlannerConfig,
    ) -> Self {
        Self {
            llm,
            search,
            retry,
            max_search_results: planner.max_search_results,
            picks: planner.resources_per_week,
            self_correction: planner.self_correction,
        }
    }

    async fn search(&self, query: &str) -> UpstreamResult<Vec<SearchHit>> {
        let max = self.max_search_results;
        self.retry
            .run(Service::Search, "search", || self.search.search(query, max))
            .await
    }

    async fn ask(&self, label: &str, prompt: &str, mode: ResponseMode) -> UpstreamResult<String> {
        self.retry
            .run(Service::Llm, label, || self.llm.generate(prompt, mode))
            .await
    }
}

/// One week's work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicUnit {
    pub week: u32,
    /// The plan's main topic.
    pub topic: String,
    pub subtopic: String,
}

/// Enrich one subtopic. Never fails; problems show up as the outcome.
pub async fn enrich_subtopic(
    ctx: &PipelineContext,
    unit: &SubtopicUnit,
) -> (LearningModule, SubtopicOutcome) {
    tracing::info!(week = unit.week, subtopic = %unit.subtopic, "STARTING subtopic");

    let (resources, outcome) = match run_unit(ctx, unit).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                week = unit.week,
                subtopic = %unit.subtopic,
                error = %e,
                "Subtopic enrichment failed"
            );
            (Vec::new(), SubtopicOutcome::Failed)
        }
    };

    tracing::info!(
        week = unit.week,
        subtopic = %unit.subtopic,
        resources = resources.len(),
        outcome = outcome.as_str(),
        "COMPLETED subtopic"
    );
    metrics::record_subtopic(outcome.as_str());

    (
        LearningModule {
            week: unit.week,
            topic: unit.subtopic.clone(),
            resources,
        },
        outcome,
    )
}

async fn run_unit(
    ctx: &PipelineContext,
    unit: &SubtopicUnit,
) -> UpstreamResult<(Vec<Resource>, SubtopicOutcome)> {
    let query = prompts::initial_query(&unit.subtopic, &unit.topic);
    let mut hits = ctx.search(&query).await?;
    if hits.is_empty() {
        return Ok((Vec::new(), SubtopicOutcome::Empty));
    }

    if ctx.self_correction {
        hits = self_correct(ctx, unit, hits).await;
    }

    let context = prompts::search_context(&hits);
    let prompt = prompts::curation(&unit.subtopic, &unit.topic, &context, ctx.picks);

    let curated = match ctx.ask("curate", &prompt, ResponseMode::Json).await {
        Ok(text) => match curation::parse_curated(&text, ctx.picks) {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(week = unit.week, error = %e, "Unusable curation output");
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!(week = unit.week, error = %e, "Curation call failed");
            Vec::new()
        }
    };

    if curated.is_empty() {
        tracing::info!(week = unit.week, "Falling back to raw search results");
        return Ok((
            curation::fallback_resources(&hits, ctx.picks),
            SubtopicOutcome::Fallback,
        ));
    }

    Ok((curated, SubtopicOutcome::Curated))
}

/// Sanity-check the hits and re-query once when the model rejects them.
async fn self_correct(
    ctx: &PipelineContext,
    unit: &SubtopicUnit,
    hits: Vec<SearchHit>,
) -> Vec<SearchHit> {
    let context = prompts::search_context(&hits);
    let prompt = prompts::sanity_check(&unit.subtopic, &unit.topic, &context);

    let verdict = match ctx.ask("sanity_check", &prompt, ResponseMode::Text).await {
        Ok(text) => curation::parse_verdict(&text),
        Err(e) => {
            tracing::warn!(week = unit.week, error = %e, "Sanity check failed, keeping results");
            return hits;
        }
    };

    tracing::debug!(week = unit.week, verdict = ?verdict, "Sanity check answered");
    if verdict == Verdict::Relevant {
        return hits;
    }

    tracing::info!(week = unit.week, subtopic = %unit.subtopic, "Results judged irrelevant, refining query");

    let prompt = prompts::refine_query(&unit.subtopic, &unit.topic);
    let refined = match ctx.ask("refine_query", &prompt, ResponseMode::Text).await {
        Ok(text) => curation::clean_query(&text),
        Err(e) => {
            tracing::warn!(week = unit.week, error = %e, "Query refinement failed, keeping results");
            return hits;
        }
    };
    if refined.is_empty() {
        return hits;
    }

    tracing::debug!(week = unit.week, query = %refined, "Re-querying");
    match ctx.search(&refined).await {
        Ok(new_hits) if !new_hits.is_empty() => new_hits,
        Ok(_) => hits,
        Err(e) => {
            tracing::warn!(week = unit.week, error = %e, "Refined search failed, keeping results");
            hits
        }
    }
}
