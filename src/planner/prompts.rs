//! Prompt templates for each model step.

use crate::upstream::search::SearchHit;

pub fn decomposition(topic: &str, weeks: usize) -> String {
    format!(
        "Break down '{topic}' into {weeks} logical, weekly sub-topics for a beginner. \
         Respond with ONLY the list of {weeks} sub-topics, separated by newlines, without any prefixes."
    )
}

pub fn initial_query(subtopic: &str, topic: &str) -> String {
    format!("Beginner tutorial for '{subtopic}' in the context of '{topic}'")
}

pub fn sanity_check(subtopic: &str, topic: &str, context: &str) -> String {
    format!(
        "Are these search results relevant for a beginner learning '{subtopic}' in the context of '{topic}'? \
         Answer ONLY with YES or NO.\n\nResults:\n{context}"
    )
}

pub fn refine_query(subtopic: &str, topic: &str) -> String {
    format!(
        "Create a better, more specific search query for a beginner learning '{subtopic}' \
         in the context of '{topic}'. Your response must be ONLY the new search query."
    )
}

pub fn curation(subtopic: &str, topic: &str, context: &str, picks: usize) -> String {
    format!(
        "You are a helpful learning assistant. From the following list of search results about '{subtopic}', \
         select the {picks} most relevant and highest quality resources for a beginner learning about '{topic}'.\n\
         Your response MUST be in a valid JSON format, containing a list named \"resources\". \
         If you cannot find {picks} good resources, return an empty list.\n\n\
         Search Results:\n{context}\n\n\
         Example JSON output: {{\"resources\": [{{\"title\": \"Example Title\", \"url\": \"https://example.com\", \"type\": \"article\"}}]}}"
    )
}

/// Render hits as the bullet list the prompts embed.
pub fn search_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("- {}: {}", hit.title, hit.url))
        .collect::<Vec<_>>()
        .join("\n")
}
