//! Document store for saved plans.
//!
//! # Responsibilities
//! - Insert one document per saved plan
//! - List a user's saved plans
//! - Generate document IDs in the store's own format
//!
//! # Design Decisions
//! - Modules are persisted as a JSON string; the collection schema has no
//!   nested attributes
//! - `MemoryStore` shares the trait so local runs and tests need no Appwrite project

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{StoreConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::upstream::types::{status_error, Service, UpstreamError, UpstreamResult};

/// A plan as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "planTitle")]
    pub plan_title: String,
    /// Serialized JSON array of modules.
    pub modules: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// A plan as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub document: PlanDocument,
}

/// Persistence for saved plans.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Insert a document, returning its ID.
    async fn create(&self, document: PlanDocument) -> UpstreamResult<String>;

    /// All documents owned by `user_id`, oldest first.
    async fn list_by_user(&self, user_id: &str) -> UpstreamResult<Vec<StoredDocument>>;
}

/// Generate a 20-character document ID: hex seconds, hex microseconds,
/// then random hex padding.
pub fn unique_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let mut id = format!("{:08x}{:05x}", now.as_secs(), now.subsec_micros());
    for _ in 0..7 {
        id.push(char::from_digit(fastrand::u32(0..16), 16).unwrap_or('0'));
    }
    id
}

/// Appwrite Databases REST client.
#[derive(Clone)]
pub struct AppwriteStore {
    http: reqwest::Client,
    documents_url: String,
    project_id: String,
    api_key: String,
    timeout_secs: u64,
}

/// Largest page requested when listing a user's plans.
const LIST_LIMIT: u32 = 100;

impl AppwriteStore {
    pub fn new(
        config: &StoreConfig,
        timeouts: &TimeoutConfig,
        project_id: String,
        api_key: String,
        database_id: String,
    ) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()
            .map_err(|e| UpstreamError::Transport {
                service: Service::Store,
                message: e.to_string(),
            })?;

        let documents_url = format!(
            "{}/databases/{}/collections/{}/documents",
            config.endpoint.trim_end_matches('/'),
            database_id,
            config.collection_id
        );

        Ok(Self {
            http,
            documents_url,
            project_id,
            api_key,
            timeout_secs: timeouts.upstream_secs,
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, &self.documents_url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Response-Format", "1.5.0")
    }

    async fn insert(&self, document: PlanDocument) -> UpstreamResult<String> {
        let document_id = unique_id();
        let response = self
            .request(reqwest::Method::POST)
            .json(&json!({ "documentId": document_id, "data": document }))
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Store, e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(Service::Store, response).await);
        }

        let created: CreatedDocument = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Store, e, self.timeout_secs))?;

        Ok(created.id.unwrap_or(document_id))
    }

    async fn query_user(&self, user_id: &str) -> UpstreamResult<Vec<StoredDocument>> {
        let equal = json!({ "method": "equal", "attribute": "userId", "values": [user_id] });
        let limit = json!({ "method": "limit", "values": [LIST_LIMIT] });

        let response = self
            .request(reqwest::Method::GET)
            .query(&[("queries[]", equal.to_string()), ("queries[]", limit.to_string())])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Store, e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(Service::Store, response).await);
        }

        let list: DocumentList = response
            .json()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Service::Store, e, self.timeout_secs))?;

        Ok(list.documents)
    }
}

impl std::fmt::Debug for AppwriteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppwriteStore")
            .field("documents_url", &self.documents_url)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[async_trait]
impl PlanStore for AppwriteStore {
    async fn create(&self, document: PlanDocument) -> UpstreamResult<String> {
        let start = Instant::now();
        let result = self.insert(document).await;
        metrics::record_upstream_call(Service::Store, result.is_ok(), start);
        result
    }

    async fn list_by_user(&self, user_id: &str) -> UpstreamResult<Vec<StoredDocument>> {
        let start = Instant::now();
        let result = self.query_user(user_id).await;
        metrics::record_upstream_call(Service::Store, result.is_ok(), start);
        result
    }
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    #[serde(rename = "$id")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<StoredDocument>,
}

/// Process-local store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<String, (u64, StoredDocument)>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn create(&self, document: PlanDocument) -> UpstreamResult<String> {
        let id = unique_id();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.documents.insert(
            id.clone(),
            (
                seq,
                StoredDocument {
                    id: id.clone(),
                    created_at: Some(created_at.to_string()),
                    document,
                },
            ),
        );
        Ok(id)
    }

    async fn list_by_user(&self, user_id: &str) -> UpstreamResult<Vec<StoredDocument>> {
        let mut found: Vec<(u64, StoredDocument)> = self
            .documents
            .iter()
            .filter(|r| r.value().1.document.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        Ok(found.into_iter().map(|(_, doc)| doc).collect())
    }
}
