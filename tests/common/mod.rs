//! Shared utilities for integration tests: mock upstream services and a
//! server harness.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use aura_backend::config::{AppConfig, StoreBackend};
use aura_backend::http::HttpServer;
use aura_backend::lifecycle::Shutdown;
use aura_backend::upstream::ServiceRegistry;

pub const GOOGLE_KEY: &str = "test-google-key";
pub const TAVILY_KEY: &str = "test-tavily-key";
pub const APPWRITE_KEY: &str = "test-appwrite-key";
pub const SUBTOPICS: [&str; 4] = ["Basics", "Ownership", "Traits", "Async"];

/// Knobs and recordings shared by the mock Gemini, Tavily and Appwrite.
#[derive(Default)]
pub struct MockState {
    pub prompts: Mutex<Vec<String>>,
    pub search_queries: Mutex<Vec<String>>,
    pub documents: Mutex<Vec<Value>>,
    /// Remaining searches to answer with 503.
    pub search_failures: AtomicU32,
    /// When non-zero, every search answers with this status.
    pub search_status: AtomicU16,
    /// When non-zero, every model call answers with this status.
    pub gemini_status: AtomicU16,
    /// Sanity checks answer NO.
    pub reject_results: AtomicBool,
    /// Curation answers with prose instead of JSON.
    pub garbage_curation: AtomicBool,
}

impl MockState {
    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

pub struct Upstreams {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl Upstreams {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start one axum server playing all three hosted services.
pub async fn start_upstreams() -> Upstreams {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/v1beta/models/{model}", post(gemini))
        .route("/search", post(tavily))
        .route(
            "/v1/databases/{db}/collections/{collection}/documents",
            post(create_document).get(list_documents),
        )
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Upstreams { addr, state }
}

fn gemini_text(text: &str) -> Json<Value> {
    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

async fn gemini(
    State(state): State<Arc<MockState>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(GOOGLE_KEY) {
        return (StatusCode::FORBIDDEN, "API key not valid").into_response();
    }
    assert!(model.ends_with(":generateContent"), "unexpected model path {model}");

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt.clone());

    let status = state.gemini_status.load(Ordering::SeqCst);
    if status != 0 {
        let code = StatusCode::from_u16(status).unwrap();
        return (code, Json(json!({ "error": { "code": status, "message": "mock failure" } })))
            .into_response();
    }

    if prompt.starts_with("Break down") {
        return gemini_text(&SUBTOPICS.join("\n")).into_response();
    }
    if prompt.contains("Answer ONLY with YES or NO") {
        let verdict = if state.reject_results.load(Ordering::SeqCst) { "NO" } else { "YES" };
        return gemini_text(verdict).into_response();
    }
    if prompt.contains("Create a better") {
        return gemini_text("\"refined beginner query\"").into_response();
    }

    assert_eq!(
        body["generationConfig"]["responseMimeType"], "application/json",
        "curation must request JSON output"
    );
    if state.garbage_curation.load(Ordering::SeqCst) {
        return gemini_text("I could not decide, sorry.").into_response();
    }

    // Pick the last two listed results so curation is distinguishable from fallback.
    let urls: Vec<&str> = prompt
        .lines()
        .filter(|l| l.starts_with("- "))
        .filter_map(|l| l.rsplit_once(": ").map(|(_, url)| url))
        .collect();
    let resources: Vec<Value> = urls
        .iter()
        .rev()
        .take(2)
        .map(|url| json!({ "title": format!("Curated {url}"), "url": url, "type": "article" }))
        .collect();
    gemini_text(&json!({ "resources": resources }).to_string()).into_response()
}

async fn tavily(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("Bearer {TAVILY_KEY}");
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Unauthorized" }))).into_response();
    }

    let query = body["query"].as_str().unwrap_or_default().to_string();
    state.search_queries.lock().unwrap().push(query.clone());

    let status = state.search_status.load(Ordering::SeqCst);
    if status != 0 {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    if state
        .search_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let max = body["max_results"].as_u64().unwrap_or(5) as usize;
    let slug: String = query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let results: Vec<Value> = (1..=3)
        .map(|i| {
            let url = if i == 1 {
                format!("https://www.youtube.com/watch?v={slug}")
            } else {
                format!("https://example.com/{slug}/{i}")
            };
            json!({ "title": format!("Result {i} for {query}"), "url": url, "content": "...", "score": 0.9 })
        })
        .take(max)
        .collect();

    Json(json!({ "query": query, "results": results })).into_response()
}

fn appwrite_authorized(headers: &HeaderMap) -> bool {
    headers.get("x-appwrite-key").and_then(|v| v.to_str().ok()) == Some(APPWRITE_KEY)
        && headers.contains_key("x-appwrite-project")
}

async fn create_document(
    State(state): State<Arc<MockState>>,
    Path((_db, collection)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !appwrite_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut doc = body["data"].clone();
    doc["$id"] = body["documentId"].clone();
    doc["$collectionId"] = json!(collection);
    doc["$createdAt"] = json!("2026-01-01T00:00:00.000+00:00");
    state.documents.lock().unwrap().push(doc.clone());

    (StatusCode::CREATED, Json(doc)).into_response()
}

async fn list_documents(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if !appwrite_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let user_id = params
        .iter()
        .filter(|(k, _)| k == "queries[]")
        .filter_map(|(_, v)| serde_json::from_str::<Value>(v).ok())
        .find(|q| q["method"] == "equal" && q["attribute"] == "userId")
        .and_then(|q| q["values"][0].as_str().map(str::to_string));

    let documents: Vec<Value> = state
        .documents
        .lock()
        .unwrap()
        .iter()
        .filter(|d| user_id.as_deref().is_some_and(|u| d["userId"] == u))
        .cloned()
        .collect();

    Json(json!({ "total": documents.len(), "documents": documents })).into_response()
}

/// Config pointing every upstream at the mocks, with fast retries.
pub fn config_for(upstreams: &Upstreams) -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.llm.base_url = upstreams.base_url();
    config.search.base_url = upstreams.base_url();
    config.store.backend = StoreBackend::Appwrite;
    config.store.endpoint = format!("{}/v1", upstreams.base_url());
    config.timeouts.upstream_secs = 5;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}

pub fn secrets(key: &str) -> Option<String> {
    match key {
        "GOOGLE_API_KEY" => Some(GOOGLE_KEY.to_string()),
        "TAVILY_API_KEY" => Some(TAVILY_KEY.to_string()),
        "APPWRITE_PROJECT_ID" => Some("test-project".to_string()),
        "APPWRITE_API_KEY" => Some(APPWRITE_KEY.to_string()),
        "APPWRITE_DATABASE_ID" => Some("test-db".to_string()),
        _ => None,
    }
}

pub struct TestServer {
    pub url: String,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}

/// Start the API on an ephemeral port with secrets read through `lookup`.
pub async fn start_server<F>(config: AppConfig, lookup: F) -> TestServer
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let config = Arc::new(config);
    let registry = Arc::new(ServiceRegistry::with_lookup(config.clone(), lookup));
    let server = HttpServer::with_registry(config, registry);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, receiver).await });

    TestServer { url, shutdown, handle }
}

/// Mocks plus a server wired to them.
pub async fn start_stack() -> (Upstreams, TestServer) {
    let upstreams = start_upstreams().await;
    let server = start_server(config_for(&upstreams), secrets).await;
    (upstreams, server)
}
