//! Parsing of model output and the raw-search fallback.
//!
//! Model text is never trusted to be clean: list markers, code fences and
//! chatty preambles are all stripped before use.

use serde::Deserialize;
use thiserror::Error;

use crate::planner::types::{Resource, ResourceKind};
use crate::upstream::search::SearchHit;

/// The model's relevance judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Relevant,
    Irrelevant,
}

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("curation response was empty")]
    Empty,

    #[error("curation response contained no JSON")]
    NoJson,

    #[error("curation response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Split a decomposition answer into at most `weeks` subtopics.
pub fn parse_subtopics(text: &str, weeks: usize) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(weeks)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let mut s = line.trim();

    if let Some(rest) = s.strip_prefix(['-', '*', '•']) {
        if rest.starts_with(char::is_whitespace) {
            s = rest.trim_start();
        }
    }

    // "Week 1:" / "week 2 -"
    if s.len() > 4 && s.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("week")) {
        let rest = s[4..].trim_start();
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            let after = rest[digits..].trim_start();
            if let Some(body) = after.strip_prefix([':', '-', '.']) {
                s = body.trim_start();
            }
        }
    }

    // "1." / "2)"
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(body) = s[digits..].strip_prefix(['.', ')']) {
            s = body.trim_start();
        }
    }

    s.trim_matches('*').trim()
}

/// Read a YES/NO answer. Unclear answers count as relevant so the
/// pipeline does not burn a re-query on noise.
pub fn parse_verdict(text: &str) -> Verdict {
    let upper = text.trim().to_ascii_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    match words.first() {
        Some(&"NO") => Verdict::Irrelevant,
        Some(&"YES") => Verdict::Relevant,
        _ if words.contains(&"NO") && !words.contains(&"YES") => Verdict::Irrelevant,
        _ => Verdict::Relevant,
    }
}

/// Clean a refined search query: one line, no wrapping quotes.
pub fn clean_query(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

#[derive(Debug, Deserialize)]
struct RawResource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// The span from the first `{` or `[` to the last matching closer.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (start < end).then(|| &text[start..=end])
}

/// Parse the curation answer into at most `picks` resources.
pub fn parse_curated(text: &str, picks: usize) -> Result<Vec<Resource>, CurationError> {
    let cleaned = text.trim().replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(CurationError::Empty);
    }

    let value: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(embedded_json(cleaned).ok_or(CurationError::NoJson)?)?,
    };
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("resources") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawResource>(item).ok())
        .filter_map(|raw| {
            let url = raw.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
            let title = raw
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| url.clone());
            let kind = raw
                .kind
                .map(|k| k.trim().to_ascii_lowercase())
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| ResourceKind::classify(&url).as_str().to_string());
            Some(Resource { title, url, kind })
        })
        .take(picks)
        .collect())
}

/// First `picks` raw hits, used when curation yields nothing.
pub fn fallback_resources(hits: &[SearchHit], picks: usize) -> Vec<Resource> {
    hits.iter()
        .take(picks)
        .map(|hit| Resource {
            title: if hit.title.trim().is_empty() {
                "No title".to_string()
            } else {
                hit.title.trim().to_string()
            },
            url: hit.url.clone(),
            kind: ResourceKind::classify(&hit.url).as_str().to_string(),
        })
        .collect()
}
