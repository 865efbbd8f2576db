//! Language model client.
//!
//! # Responsibilities
//! - Send a single-turn prompt and return the model's text
//! - Request JSON output for structured steps (curation)
//! - Map HTTP and payload failures onto `UpstreamError`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::{LlmConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::upstream::types::{status_error, Service, UpstreamError, UpstreamResult};

/// Output format requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Free text.
    Text,
    /// A JSON document (provider-side structured output).
    Json,
}

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one prompt and return the answer text, untrimmed.
    async fn generate(&self, prompt: &str, mode: ResponseMode) -> UpstreamResult<String>;
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, timeouts: &TimeoutConfig, api_key: String) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()
            .map_err(|e| UpstreamError::Transport {
                service: Service::Llm,
                message: e.to_string(),
            })?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http,
            endpoint,
            api_key,
            temperature: config.temperature,
            timeout_secs: timeouts.upstream_secs,
        })
    }

    fn request_body(&self, prompt: &str, mode: ResponseMode) -> serde_json::Value {
        let mut generation_config = serde_json::Map::new();
        if mode == ResponseMode::Json {
            generation_config.insert("responseMimeType".to_string(), json!("application/json"));
        }
        if let Some(t) = self.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }

        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        })
    }

    async fn call(&self, prompt: &str, mode: ResponseMode) -> UpstreamResult<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt, mode))
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Llm, e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(Service::Llm, response).await);
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Llm, e, self.timeout_secs))?;

        payload.into_text()
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str, mode: ResponseMode) -> UpstreamResult<String> {
        let start = Instant::now();
        let result = self.call(prompt, mode).await;
        metrics::record_upstream_call(Service::Llm, result.is_ok(), start);
        result
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> UpstreamResult<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked ({})", r))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(UpstreamError::EmptyResponse { service: Service::Llm, reason });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .map(|r| format!("finish reason {}", r))
                .unwrap_or_else(|| "no text parts".to_string());
            return Err(UpstreamError::EmptyResponse { service: Service::Llm, reason });
        }

        Ok(text)
    }
}
