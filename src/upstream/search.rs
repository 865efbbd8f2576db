//! Web search client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{SearchConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::upstream::types::{status_error, Service, UpstreamError, UpstreamResult};

/// One raw search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Anything that turns a query into ranked hits.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> UpstreamResult<Vec<SearchHit>>;
}

/// Client for the Tavily search API.
#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    search_depth: String,
    timeout_secs: u64,
}

impl TavilyClient {
    pub fn new(config: &SearchConfig, timeouts: &TimeoutConfig, api_key: String) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()
            .map_err(|e| UpstreamError::Transport {
                service: Service::Search,
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}/search", config.base_url.trim_end_matches('/')),
            api_key,
            search_depth: config.search_depth.clone(),
            timeout_secs: timeouts.upstream_secs,
        })
    }

    async fn call(&self, query: &str, max_results: usize) -> UpstreamResult<Vec<SearchHit>> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": query,
                "max_results": max_results,
                "search_depth": self.search_depth,
            }))
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Search, e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(Service::Search, response).await);
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Search, e, self.timeout_secs))?;

        Ok(payload
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .take(max_results)
            .collect())
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("endpoint", &self.endpoint)
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> UpstreamResult<Vec<SearchHit>> {
        let start = Instant::now();
        let result = self.call(query, max_results).await;
        metrics::record_upstream_call(Service::Search, result.is_ok(), start);
        result
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}
