//! CORS policy.
//!
//! Origins are matched exactly, except that a leading `*.` in the host
//! matches any subdomain: `https://*.netlify.app` allows
//! `https://preview-42--aura.netlify.app` but not `https://netlify.app`.

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Compiled list of allowed origins.
#[derive(Debug, Clone, Default)]
pub struct OriginMatcher {
    exact: Vec<String>,
    /// (scheme + "://", domain suffix starting with '.')
    wildcard: Vec<(String, String)>,
}

impl OriginMatcher {
    pub fn new(origins: &[String]) -> Self {
        let mut matcher = Self::default();
        for origin in origins {
            let origin = origin.trim().trim_end_matches('/').to_ascii_lowercase();
            match origin.split_once("://*.") {
                Some((scheme, suffix)) if !suffix.is_empty() => matcher
                    .wildcard
                    .push((format!("{scheme}://"), format!(".{suffix}"))),
                _ => matcher.exact.push(origin),
            }
        }
        matcher
    }

    pub fn matches(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        if self.exact.iter().any(|o| *o == origin) {
            return true;
        }
        self.wildcard.iter().any(|(scheme, suffix)| {
            origin
                .strip_prefix(scheme.as_str())
                .and_then(|host| host.strip_suffix(suffix.as_str()))
                .is_some_and(|sub| !sub.is_empty() && !sub.contains('/'))
        })
    }
}

/// CORS layer allowing credentials from the configured origins.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let matcher = OriginMatcher::new(&config.allowed_origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|o| matcher.matches(o))
        }))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
