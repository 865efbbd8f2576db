//! Upstream service integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (API keys, Appwrite project)
//!     → registry.rs (lazy, once-only client construction)
//!     → llm.rs     (Gemini generateContent)
//!     → search.rs  (Tavily search)
//!     → store.rs   (Appwrite documents / in-memory)
//! ```
//!
//! # Security Constraints
//! - API keys ONLY from environment variables
//! - Never log keys; client Debug impls omit them
//! - All calls have connect and total timeouts

pub mod llm;
pub mod registry;
pub mod search;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use llm::{GeminiClient, LanguageModel, ResponseMode};
pub use registry::{Credentials, ServiceRegistry, Services};
pub use search::{SearchHit, SearchProvider, TavilyClient};
pub use store::{AppwriteStore, MemoryStore, PlanDocument, PlanStore, StoredDocument};
pub use types::{Service, UpstreamError, UpstreamResult};
