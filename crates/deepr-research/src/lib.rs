//! Iterative web research for deepr.
//!
//! This crate provides:
//! - `Researcher`, the loop controller that plans searches, processes links,
//!   decides when to stop and streams status events
//! - The model-driven steps it composes: query planning, relevance
//!   classification, context extraction and report synthesis
//! - A strict parser for list-of-strings model output

use std::sync::Arc;

use deepr_core::{PageFetcher, Provider, SearchProvider};

mod controller;
mod event;
mod extract;
mod list_parse;
mod llm;
mod pipeline;
mod planner;
mod relevance;
mod report;

pub use controller::{
    AggregatedContexts, IterationOutcome, ResearchOutcome, ResearchRequest, Researcher, StopReason,
};
pub use event::{EventSink, ResearchEvent, ResearchStream};
pub use extract::{extract_context, EXTRACT_SYSTEM_PROMPT};
pub use list_parse::{parse_string_list, ListParseError};
pub use llm::Llm;
pub use pipeline::{process_link, process_links, CandidateLink};
pub use planner::{
    initial_queries, next_queries, PlannerVerdict, DONE_SENTINEL, INITIAL_SYSTEM_PROMPT,
    MAX_QUERIES, PLANNER_SYSTEM_PROMPT,
};
pub use relevance::{classify_page, parse_relevance, Relevance, RELEVANCE_SYSTEM_PROMPT};
pub use report::{synthesize_report, Report, FALLBACK_REPORT, REPORT_SYSTEM_PROMPT};

/// Characters of page text shown to the model when classifying or extracting.
pub const PAGE_CHAR_LIMIT: usize = 20_000;

/// The external collaborators one research run talks to.
///
/// All three usually share one HTTP client, so cloning this bundle into a run
/// and dropping it afterwards scopes the run's connections.
#[derive(Clone)]
pub struct Capabilities {
    pub provider: Arc<dyn Provider>,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
}

impl Capabilities {
    pub fn new(
        provider: Arc<dyn Provider>,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            provider,
            search,
            fetcher,
        }
    }
}

/// The first `limit` characters of `text`, cut on a char boundary.
pub(crate) fn excerpt(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("short", 100), "short");
        assert_eq!(excerpt("", 3), "");
    }
}
