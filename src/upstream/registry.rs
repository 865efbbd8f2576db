//! Lazy construction of upstream clients.
//!
//! # Responsibilities
//! - Read API secrets from the environment on first use
//! - Report every missing variable in one error
//! - Build the LLM, search and store clients exactly once
//!
//! # Design Decisions
//! - The server starts and serves `/` without secrets; plan endpoints fail
//!   with 500 until the environment is fixed
//! - A failed initialization is not cached, so the next request retries it

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{AppConfig, StoreBackend};
use crate::upstream::llm::{GeminiClient, LanguageModel};
use crate::upstream::search::{SearchProvider, TavilyClient};
use crate::upstream::store::{AppwriteStore, MemoryStore, PlanStore};
use crate::upstream::types::{UpstreamError, UpstreamResult};

/// Secrets needed to reach the hosted services.
#[derive(Clone)]
pub struct Credentials {
    pub google_api_key: String,
    pub tavily_api_key: String,
    /// `None` when the memory store is configured.
    pub appwrite: Option<AppwriteCredentials>,
}

#[derive(Clone)]
pub struct AppwriteCredentials {
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
}

impl Credentials {
    /// Collect secrets through `lookup`, naming every absent or blank variable.
    pub fn from_lookup<F>(backend: StoreBackend, lookup: F) -> UpstreamResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut required = vec!["GOOGLE_API_KEY", "TAVILY_API_KEY"];
        if backend == StoreBackend::Appwrite {
            required.extend(["APPWRITE_PROJECT_ID", "APPWRITE_API_KEY", "APPWRITE_DATABASE_ID"]);
        }

        let values: Vec<(&str, Option<String>)> = required
            .iter()
            .map(|key| (*key, lookup(*key).filter(|v| !v.trim().is_empty())))
            .collect();

        let missing: Vec<String> = values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(UpstreamError::MissingCredentials(missing));
        }

        let get = |key: &str| {
            values
                .iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            google_api_key: get("GOOGLE_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            appwrite: (backend == StoreBackend::Appwrite).then(|| AppwriteCredentials {
                project_id: get("APPWRITE_PROJECT_ID"),
                api_key: get("APPWRITE_API_KEY"),
                database_id: get("APPWRITE_DATABASE_ID"),
            }),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("tavily_api_key", &"<redacted>")
            .field("appwrite", &self.appwrite.as_ref().map(|a| &a.project_id))
            .finish()
    }
}

/// The three upstream clients, shared across requests.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchProvider>,
    pub store: Arc<dyn PlanStore>,
}

impl Services {
    /// Build real clients for the configured providers.
    pub fn from_config(config: &AppConfig, credentials: Credentials) -> UpstreamResult<Self> {
        let llm = GeminiClient::new(&config.llm, &config.timeouts, credentials.google_api_key)?;
        let search = TavilyClient::new(&config.search, &config.timeouts, credentials.tavily_api_key)?;

        let store: Arc<dyn PlanStore> = match (config.store.backend, credentials.appwrite) {
            (StoreBackend::Appwrite, Some(aw)) => Arc::new(AppwriteStore::new(
                &config.store,
                &config.timeouts,
                aw.project_id,
                aw.api_key,
                aw.database_id,
            )?),
            (StoreBackend::Appwrite, None) => {
                return Err(UpstreamError::MissingCredentials(vec![
                    "APPWRITE_PROJECT_ID".to_string(),
                    "APPWRITE_API_KEY".to_string(),
                    "APPWRITE_DATABASE_ID".to_string(),
                ]))
            }
            (StoreBackend::Memory, _) => Arc::new(MemoryStore::new()),
        };

        Ok(Self {
            llm: Arc::new(llm),
            search: Arc::new(search),
            store,
        })
    }
}

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// On-demand holder for `Services`.
pub struct ServiceRegistry {
    config: Arc<AppConfig>,
    lookup: Arc<EnvLookup>,
    services: OnceCell<Services>,
}

impl ServiceRegistry {
    /// Registry reading secrets from the process environment.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_lookup(config, |key| std::env::var(key).ok())
    }

    /// Registry reading secrets through a custom lookup.
    pub fn with_lookup<F>(config: Arc<AppConfig>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            config,
            lookup: Arc::new(lookup),
            services: OnceCell::new(),
        }
    }

    /// Registry with clients already in place.
    pub fn preloaded(config: Arc<AppConfig>, services: Services) -> Self {
        Self {
            config,
            lookup: Arc::new(|_: &str| None::<String>),
            services: OnceCell::new_with(Some(services)),
        }
    }

    /// Get the clients, building them on the first successful call.
    pub async fn get(&self) -> UpstreamResult<Services> {
        self.services
            .get_or_try_init(|| async {
                tracing::info!("Initializing external clients...");
                let credentials =
                    Credentials::from_lookup(self.config.store.backend, |k| (self.lookup)(k))?;
                let services = Services::from_config(&self.config, credentials)?;
                tracing::info!(
                    model = %self.config.llm.model,
                    store = ?self.config.store.backend,
                    "External clients initialized"
                );
                Ok(services)
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.services.initialized()
    }
}
