//! Route handlers.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::planner::{
    LearningPlanResponse, LearningRequest, SavePlanRequest, SavePlanResponse, SavedPlan,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootStatus {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    /// Whether the upstream clients have been built yet.
    pub services_initialized: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub async fn root() -> Json<RootStatus> {
    Json(RootStatus {
        status: "Aura Backend is running!".to_string(),
    })
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services_initialized: state.engine.registry().is_initialized(),
    })
}

pub async fn generate_plan(
    State(state): State<AppState>,
    payload: Result<Json<LearningRequest>, JsonRejection>,
) -> Result<Json<LearningPlanResponse>, ApiError> {
    let Json(request) = payload?;
    let plan = state.engine.generate(&request).await?;
    tracing::info!(
        title = %plan.plan_title,
        weeks = plan.modules.len(),
        "Plan generated"
    );
    Ok(Json(plan))
}

pub async fn save_plan(
    State(state): State<AppState>,
    payload: Result<Json<SavePlanRequest>, JsonRejection>,
) -> Result<Json<SavePlanResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.engine.save(&request).await?))
}

pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
) -> Result<Json<Vec<SavedPlan>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("userId query parameter is required"))?;
    Ok(Json(state.engine.list(&user_id).await?))
}
