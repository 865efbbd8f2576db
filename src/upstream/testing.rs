//! Scriptable stand-ins for the upstream traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::upstream::llm::{LanguageModel, ResponseMode};
use crate::upstream::search::{SearchHit, SearchProvider};
use crate::upstream::store::MemoryStore;
use crate::upstream::registry::Services;
use crate::upstream::types::UpstreamResult;

type LlmScript = dyn Fn(&str, ResponseMode) -> UpstreamResult<String> + Send + Sync;
type SearchScript = dyn Fn(&str) -> UpstreamResult<Vec<SearchHit>> + Send + Sync;
type LatencyScript = dyn Fn(&str) -> Option<Duration> + Send + Sync;

/// LLM answering through a closure and recording every prompt.
pub struct ScriptedLlm {
    script: Box<LlmScript>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, ResponseMode) -> UpstreamResult<String> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, prompt: &str, mode: ResponseMode) -> UpstreamResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.script)(prompt, mode)
    }
}

/// Search answering through a closure and recording every query.
///
/// An optional latency script delays matching queries; `peak` holds the
/// most searches ever in flight at once.
pub struct ScriptedSearch {
    script: Box<SearchScript>,
    latency: Option<Box<LatencyScript>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> UpstreamResult<Vec<SearchHit>> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            latency: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency<L>(mut self, latency: L) -> Self
    where
        L: Fn(&str) -> Option<Duration> + Send + Sync + 'static,
    {
        self.latency = Some(Box::new(latency));
        self
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, max_results: usize) -> UpstreamResult<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.latency.as_ref().and_then(|latency| latency(query)) {
            tokio::time::sleep(delay).await;
        }
        (self.script)(query).map(|hits| hits.into_iter().take(max_results).collect())
    }
}

pub fn hit(title: &str, url: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        content: String::new(),
        score: None,
    }
}

pub fn services(llm: Arc<ScriptedLlm>, search: Arc<ScriptedSearch>, store: MemoryStore) -> Services {
    Services {
        llm,
        search,
        store: Arc::new(store),
    }
}
