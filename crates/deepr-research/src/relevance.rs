use tracing::debug;

use crate::llm::Llm;
use crate::{excerpt, PAGE_CHAR_LIMIT};

pub const RELEVANCE_SYSTEM_PROMPT: &str =
    "You are a strict and concise evaluator of research relevance.";

const RELEVANCE_INSTRUCTIONS: &str = "Decide whether the webpage above contains information that is relevant and useful for answering the query. \
Answer with exactly one word: Yes if the page is useful, No if it is not. Do not add anything else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Useful,
    NotUseful,
}

/// Normalize a classification reply.
///
/// An exact `Yes`/`No` wins, then containment (`Yes` checked first).
/// Anything else is `NotUseful`.
pub fn parse_relevance(reply: &str) -> Relevance {
    match reply.trim() {
        "Yes" => Relevance::Useful,
        "No" => Relevance::NotUseful,
        other if other.contains("Yes") => Relevance::Useful,
        _ => Relevance::NotUseful,
    }
}

/// Classify fetched page text against the user's query.
pub async fn classify_page(llm: Llm<'_>, query: &str, page: &str) -> Relevance {
    let user = format!(
        "User Query: {}\n\nWebpage Content (first {} characters):\n{}\n\n{}",
        query,
        PAGE_CHAR_LIMIT,
        excerpt(page, PAGE_CHAR_LIMIT),
        RELEVANCE_INSTRUCTIONS
    );

    let relevance = match llm.ask("classify_page", RELEVANCE_SYSTEM_PROMPT, user).await {
        Some(reply) => parse_relevance(&reply),
        None => Relevance::NotUseful,
    };
    debug!(?relevance, "Classified page");
    relevance
}
