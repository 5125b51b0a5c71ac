//! Per-link processing: fetch, classify, extract.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::extract::extract_context;
use crate::llm::Llm;
use crate::relevance::{classify_page, Relevance};
use crate::Capabilities;

/// A unique URL for one iteration and the search query that first produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub query: String,
}

impl CandidateLink {
    pub fn new(url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: query.into(),
        }
    }
}

/// Run one link through fetch → classify → extract.
///
/// Every failure along the way yields `None` for this link only.
pub async fn process_link(
    caps: &Capabilities,
    llm: Llm<'_>,
    user_query: &str,
    link: &CandidateLink,
) -> Option<String> {
    let page = match caps.fetcher.fetch_text(&link.url).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            debug!(url = %link.url, "Fetched page has no text");
            return None;
        }
        Err(e) => {
            warn!(url = %link.url, fetcher = caps.fetcher.name(), error = %e, "Page fetch failed");
            return None;
        }
    };

    if classify_page(llm, user_query, &page).await == Relevance::NotUseful {
        debug!(url = %link.url, "Page judged not useful");
        return None;
    }

    let context = extract_context(llm, user_query, &link.query, &page).await;
    match &context {
        Some(_) => debug!(url = %link.url, "Extracted context from page"),
        None => debug!(url = %link.url, "No context extracted from useful page"),
    }
    context
}

/// Process every link concurrently and wait for all of them.
///
/// Results line up with `links`.
pub async fn process_links(
    caps: &Capabilities,
    llm: Llm<'_>,
    user_query: &str,
    links: &[CandidateLink],
) -> Vec<Option<String>> {
    join_all(
        links
            .iter()
            .map(|link| process_link(caps, llm, user_query, link)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use deepr_core::testing::{MockFetcher, MockSearch, ScriptedProvider};

    use crate::extract::EXTRACT_SYSTEM_PROMPT;
    use crate::relevance::RELEVANCE_SYSTEM_PROMPT;

    fn caps(provider: ScriptedProvider, fetcher: MockFetcher) -> (Capabilities, Arc<ScriptedProvider>, Arc<MockFetcher>) {
        let provider = Arc::new(provider);
        let fetcher = Arc::new(fetcher);
        let caps = Capabilities::new(provider.clone(), Arc::new(MockSearch::new()), fetcher.clone());
        (caps, provider, fetcher)
    }

    #[tokio::test]
    async fn test_useful_page_yields_context() {
        let (caps, provider, _) = caps(
            ScriptedProvider::new()
                .on(&[RELEVANCE_SYSTEM_PROMPT, "page two"], "Yes")
                .on(&[EXTRACT_SYSTEM_PROMPT, "Search Query: b"], "C2"),
            MockFetcher::new().with("https://u2", "page two"),
        );
        let llm = Llm::new(provider.as_ref(), None);

        let context = process_link(&caps, llm, "X", &CandidateLink::new("https://u2", "b")).await;
        assert_eq!(context.as_deref(), Some("C2"));
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_model_calls() {
        let (caps, provider, fetcher) = caps(ScriptedProvider::new(), MockFetcher::new());
        let llm = Llm::new(provider.as_ref(), None);

        let context = process_link(&caps, llm, "X", &CandidateLink::new("https://gone", "a")).await;
        assert_eq!(context, None);
        assert_eq!(fetcher.fetches_of("https://gone"), 1);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_page_skips_model_calls() {
        let (caps, provider, _) = caps(
            ScriptedProvider::new(),
            MockFetcher::new().with("https://blank", "  \n "),
        );
        let llm = Llm::new(provider.as_ref(), None);

        let context = process_link(&caps, llm, "X", &CandidateLink::new("https://blank", "a")).await;
        assert_eq!(context, None);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_not_useful_page_is_not_extracted() {
        let (caps, provider, _) = caps(
            ScriptedProvider::new()
                .on(&[RELEVANCE_SYSTEM_PROMPT], "No")
                .on(&[EXTRACT_SYSTEM_PROMPT], "should not be used"),
            MockFetcher::new().with("https://u3", "page three"),
        );
        let llm = Llm::new(provider.as_ref(), None);

        let context = process_link(&caps, llm, "X", &CandidateLink::new("https://u3", "b")).await;
        assert_eq!(context, None);
        assert_eq!(provider.count_matching(EXTRACT_SYSTEM_PROMPT), 0);
    }

    #[tokio::test]
    async fn test_failed_extraction_yields_none() {
        let (caps, provider, _) = caps(
            ScriptedProvider::new()
                .on(&[RELEVANCE_SYSTEM_PROMPT], "Yes")
                .fail_on(&[EXTRACT_SYSTEM_PROMPT]),
            MockFetcher::new().with("https://u4", "page four"),
        );
        let llm = Llm::new(provider.as_ref(), None);

        let context = process_link(&caps, llm, "X", &CandidateLink::new("https://u4", "a")).await;
        assert_eq!(context, None);
    }

    #[tokio::test]
    async fn test_process_links_keeps_order_and_isolates_failures() {
        let (caps, provider, _) = caps(
            ScriptedProvider::new()
                .on(&[RELEVANCE_SYSTEM_PROMPT, "page two"], "Yes")
                .on(&[RELEVANCE_SYSTEM_PROMPT, "page three"], "No")
                .on(&[RELEVANCE_SYSTEM_PROMPT, "page four"], "Yes")
                .on(&[EXTRACT_SYSTEM_PROMPT, "page two"], "C2")
                .on(&[EXTRACT_SYSTEM_PROMPT, "page four"], "C4"),
            MockFetcher::new()
                .with("https://u2", "page two")
                .with("https://u3", "page three")
                .with("https://u4", "page four"),
        );
        let llm = Llm::new(provider.as_ref(), None);

        let links = vec![
            CandidateLink::new("https://u1", "a"),
            CandidateLink::new("https://u2", "a"),
            CandidateLink::new("https://u3", "b"),
            CandidateLink::new("https://u4", "b"),
        ];
        let results = process_links(&caps, llm, "X", &links).await;
        assert_eq!(
            results,
            vec![None, Some("C2".to_string()), None, Some("C4".to_string())]
        );
    }
}
