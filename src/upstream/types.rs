//! Upstream error definitions.

use std::fmt;

use thiserror::Error;

/// The hosted services this backend depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Llm,
    Search,
    Store,
}

impl Service {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Llm => "llm",
            Service::Search => "search",
            Service::Store => "store",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while talking to an upstream service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection failed or the request could not be sent.
    #[error("{service} transport error: {message}")]
    Transport { service: Service, message: String },

    /// The call did not complete in time.
    #[error("{service} call timed out after {secs} seconds")]
    Timeout { service: Service, secs: u64 },

    /// Non-success HTTP status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape.
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: Service, message: String },

    /// The model answered with no usable text.
    #[error("{service} returned an empty response: {reason}")]
    EmptyResponse { service: Service, reason: String },

    /// Required secrets are absent from the environment.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    /// A retry budget or policy refused another attempt.
    #[error("{service} call rejected: {reason}")]
    Rejected { service: Service, reason: String },
}

impl UpstreamError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } | UpstreamError::Timeout { .. } => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The service the error originated from, if any.
    pub fn service(&self) -> Option<Service> {
        match self {
            UpstreamError::Transport { service, .. }
            | UpstreamError::Timeout { service, .. }
            | UpstreamError::Status { service, .. }
            | UpstreamError::Decode { service, .. }
            | UpstreamError::EmptyResponse { service, .. }
            | UpstreamError::Rejected { service, .. } => Some(*service),
            UpstreamError::MissingCredentials(_) => None,
        }
    }

    /// Map a reqwest failure into the matching variant.
    pub(crate) fn from_reqwest(service: Service, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { service, secs: timeout_secs }
        } else if err.is_decode() {
            UpstreamError::Decode { service, message: err.to_string() }
        } else {
            UpstreamError::Transport { service, message: err.to_string() }
        }
    }
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Read a non-success response into a `Status` error, keeping the body short.
pub(crate) async fn status_error(service: Service, response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > 512 {
        let mut cut = 512;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    UpstreamError::Status { service, status, body }
}
