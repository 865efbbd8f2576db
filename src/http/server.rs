//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, tracing, limits, request ID, security headers)
//! - Record per-route request metrics
//! - Serve until the shutdown channel fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::cors::cors_layer;
use crate::http::handlers;
use crate::http::request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
use crate::http::response::json_error_body;
use crate::observability::metrics;
use crate::planner::PlanEngine;
use crate::upstream::ServiceRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: PlanEngine,
    pub config: Arc<AppConfig>,
}

/// HTTP server for the planning API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Server whose upstream clients read secrets from the environment.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ServiceRegistry::new(config.clone()));
        Self::with_registry(config, registry)
    }

    /// Server using the given client registry.
    pub fn with_registry(config: Arc<AppConfig>, registry: Arc<ServiceRegistry>) -> Self {
        let state = AppState {
            engine: PlanEngine::new(config.clone(), registry),
            config: config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(handlers::root))
            .route("/healthz", get(handlers::healthz))
            .route("/api/generate-plan", post(handlers::generate_plan))
            .route("/api/save-plan", post(handlers::save_plan))
            .route("/api/plans", get(handlers::list_plans))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::map_response(json_error_body));

        if config.security.enable_headers {
            router = router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ));
        }

        router
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %req.request_id(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(cors_layer(&config.cors))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            store = ?self.config.store.backend,
            model = %self.config.llm.model,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Record request count and latency under the matched route template.
async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = route_label(req.extensions().get::<MatchedPath>().map(MatchedPath::as_str));
    let response = next.run(req).await;
    metrics::record_request(route, response.status().as_u16(), start);
    response
}

fn route_label(path: Option<&str>) -> &'static str {
    match path {
        Some("/") => "/",
        Some("/healthz") => "/healthz",
        Some("/api/generate-plan") => "/api/generate-plan",
        Some("/api/save-plan") => "/api/save-plan",
        Some("/api/plans") => "/api/plans",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::upstream::store::MemoryStore;
    use crate::upstream::testing::{hit, services, ScriptedLlm, ScriptedSearch};

    fn server(config: AppConfig) -> HttpServer {
        let config = Arc::new(config);
        let llm = Arc::new(ScriptedLlm::new(|prompt, _| {
            if prompt.starts_with("Break down") {
                Ok("Basics".into())
            } else if prompt.contains("YES or NO") {
                Ok("YES".into())
            } else {
                Ok(r#"{"resources": []}"#.into())
            }
        }));
        let search = Arc::new(ScriptedSearch::new(|_| Ok(vec![hit("A", "https://a.dev")])));
        let registry = ServiceRegistry::preloaded(config.clone(), services(llm, search, MemoryStore::new()));
        HttpServer::with_registry(config, Arc::new(registry))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_sets_headers() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "Aura Backend is running!"})
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header("x-request-id", "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "trace-me");
    }

    #[tokio::test]
    async fn test_security_headers_can_be_disabled() {
        let mut config = AppConfig::default();
        config.security.enable_headers = false;
        let response = server(config)
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key("x-frame-options"));
    }

    #[tokio::test]
    async fn test_generate_plan_falls_back_to_hits() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/generate-plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"topic":"Rust","hours_per_week":5,"preferred_format":"mixed"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["plan_title"], "Your Curated Plan for Rust");
        assert_eq!(body["modules"][0]["resources"][0]["url"], "https://a.dev");
    }

    #[tokio::test]
    async fn test_blank_topic_is_bad_request() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/generate-plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"topic":" ","hours_per_week":5,"preferred_format":"mixed"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "Topic must not be empty");
    }

    fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_is_unprocessable() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(post_json("/api/generate-plan", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers()["content-type"], "application/json");
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("parse the request body as JSON"), "{detail}");
    }

    #[tokio::test]
    async fn test_missing_field_is_unprocessable() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(post_json("/api/save-plan", r#"{"userId":"u1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("missing field"), "{detail}");
    }

    #[tokio::test]
    async fn test_oversized_body_has_detail() {
        let mut config = AppConfig::default();
        config.security.max_body_size = 16;
        let body = r#"{"topic":"Rust","hours_per_week":5,"preferred_format":"mixed"}"#;

        let response = server(config.clone())
            .router()
            .oneshot(post_json("/api/generate-plan", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(response).await["detail"].is_string());

        let mut request = post_json("/api/generate-plan", body);
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        let response = server(config).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_has_detail() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["detail"], "Not Found");
    }

    #[tokio::test]
    async fn test_missing_user_id_is_bad_request() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(Request::builder().uri("/api/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_wildcard_origin() {
        let response = server(AppConfig::default())
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/generate-plan")
                    .header("origin", "https://preview.netlify.app")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://preview.netlify.app"
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
    }

    #[test]
    fn test_route_labels() {
        assert_eq!(route_label(Some("/api/plans")), "/api/plans");
        assert_eq!(route_label(None), "other");
    }
}
