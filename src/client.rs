//! Typed client for the planning API.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::handlers::{HealthStatus, RootStatus};
use crate::http::response::ErrorBody;
use crate::planner::{LearningPlanResponse, LearningRequest, SavePlanRequest, SavePlanResponse, SavedPlan};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Api { status: u16, detail: String },
}

pub struct PlanClient {
    client: Client,
    base_url: String,
}

impl PlanClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /`
    pub async fn status(&self) -> Result<RootStatus, ClientError> {
        let resp = self.client.get(format!("{}/", self.base_url)).send().await?;
        decode(resp).await
    }

    /// `GET /healthz`
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let resp = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn generate_plan(&self, req: &LearningRequest) -> Result<LearningPlanResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/api/generate-plan", self.base_url))
            .json(req)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn save_plan(&self, req: &SavePlanRequest) -> Result<SavePlanResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/api/save-plan", self.base_url))
            .json(req)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn list_plans(&self, user_id: &str) -> Result<Vec<SavedPlan>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/api/plans", self.base_url))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let text = resp.text().await?;
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}
