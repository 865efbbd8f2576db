//! Aura learning-plan backend.
//!
//! Turns a topic into a multi-week learning plan: a language model splits
//! the topic into weekly subtopics, each subtopic is enriched with web
//! search results that the model checks and curates, and finished plans
//! can be saved to a document store.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum, middleware) ──▶ planner::engine
//!                                                │ decompose (LLM)
//!                                                ▼
//!                              planner::pipeline × N (bounded pool)
//!                              search → sanity check → re-query → curate
//!                                                │
//!                     upstream: llm (Gemini) · search (Tavily) · store (Appwrite)
//!                                                │
//!                              resilience: retries, backoff, deadlines
//!
//!     Cross-cutting: config · observability (tracing, metrics) · lifecycle
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod planner;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub mod client;

pub use client::PlanClient;
pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use planner::PlanEngine;
