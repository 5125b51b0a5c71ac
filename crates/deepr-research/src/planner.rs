//! Search-query planning: the seed batch and the per-iteration continuation.

use tracing::{debug, info, warn};

use crate::list_parse::parse_string_list;
use crate::llm::Llm;

pub const INITIAL_SYSTEM_PROMPT: &str = "You are a helpful and precise research assistant.";

pub const PLANNER_SYSTEM_PROMPT: &str = "You are a systematic research planner.";

/// Literal the continuation planner answers with when research is complete.
pub const DONE_SENTINEL: &str = "<done>";

/// Upper bound on queries taken from one planner reply.
pub const MAX_QUERIES: usize = 4;

const INITIAL_INSTRUCTIONS: &str = r#"Generate up to four distinct, precise web search queries that together would gather comprehensive information on the query above.

Respond with only a list of strings, for example: ["first query", "second query", "third query"]"#;

const CONTINUE_INSTRUCTIONS: &str = r#"Review the original query, the searches already performed and the contexts extracted so far, then decide whether more research is needed.

- If it is, respond with up to four new search queries as a list of strings, for example: ["new query one", "new query two"]
- If it is not, respond with exactly <done>

Output only the list or the <done> token, with no other text."#;

/// What the continuation planner decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerVerdict {
    /// The sentinel: no further research is needed.
    Done,
    /// New queries to search. Empty when the planner returned nothing usable.
    Queries(Vec<String>),
}

/// Ask for the seed batch of search queries.
///
/// Returns an empty batch when the completion fails or its text is not a list.
pub async fn initial_queries(llm: Llm<'_>, query: &str) -> Vec<String> {
    let user = format!("User Query: {}\n\n{}", query, INITIAL_INSTRUCTIONS);
    let Some(text) = llm.ask("initial_queries", INITIAL_SYSTEM_PROMPT, user).await else {
        return Vec::new();
    };

    match parse_string_list(&text) {
        Ok(queries) => {
            let queries = normalize(queries);
            info!(queries = ?queries, "Generated initial search queries");
            queries
        }
        Err(e) => {
            warn!(error = %e, raw = %text, "Could not parse initial search queries");
            Vec::new()
        }
    }
}

/// Ask whether to continue, given every query issued so far and all contexts.
///
/// The trimmed reply is compared with [`DONE_SENTINEL`] before any parsing.
/// A reply that is neither the sentinel nor a list is `Queries(vec![])`.
pub async fn next_queries(
    llm: Llm<'_>,
    query: &str,
    history: &[String],
    contexts: &[String],
) -> PlannerVerdict {
    let user = format!(
        "User Query: {}\nPrevious Search Queries: {:?}\n\nExtracted Relevant Contexts:\n{}\n\n{}",
        query,
        history,
        contexts.join("\n"),
        CONTINUE_INSTRUCTIONS
    );
    let Some(text) = llm.ask("next_queries", PLANNER_SYSTEM_PROMPT, user).await else {
        return PlannerVerdict::Queries(Vec::new());
    };

    let cleaned = text.trim();
    if cleaned == DONE_SENTINEL {
        info!("Planner signalled that research is complete");
        return PlannerVerdict::Done;
    }

    match parse_string_list(cleaned) {
        Ok(queries) => PlannerVerdict::Queries(normalize(queries)),
        Err(e) => {
            warn!(error = %e, raw = %text, "Could not parse follow-up search queries");
            PlannerVerdict::Queries(Vec::new())
        }
    }
}

/// Trim entries, drop blank ones and cap the batch.
fn normalize(queries: Vec<String>) -> Vec<String> {
    let mut queries: Vec<String> = queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if queries.len() > MAX_QUERIES {
        debug!(dropped = ?&queries[MAX_QUERIES..], "Dropping queries over the batch cap");
        queries.truncate(MAX_QUERIES);
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepr_core::testing::MockProvider;

    #[tokio::test]
    async fn test_initial_queries_parses_list() {
        let provider = MockProvider::new();
        provider.queue_response("['rust async', \"tokio internals\"]");

        let queries = initial_queries(Llm::new(&provider, None), "How does async Rust work?").await;
        assert_eq!(queries, vec!["rust async", "tokio internals"]);

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages[0].content, INITIAL_SYSTEM_PROMPT);
        assert!(request.messages[1]
            .content
            .starts_with("User Query: How does async Rust work?"));
    }

    #[tokio::test]
    async fn test_initial_queries_caps_and_cleans_batch() {
        let provider = MockProvider::new();
        provider.queue_response(r#"["a", "  ", " b ", "c", "d", "e", "f"]"#);

        let queries = initial_queries(Llm::new(&provider, None), "q").await;
        assert_eq!(queries, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_initial_queries_fails_closed() {
        let provider = MockProvider::new();
        provider.queue_response("Sure! Here are some queries you could try.");
        provider.queue_response("__import__('os').system('true')");
        provider.queue_error(deepr_core::Error::timeout("slow"));
        let llm = Llm::new(&provider, None);

        assert!(initial_queries(llm, "q").await.is_empty());
        assert!(initial_queries(llm, "q").await.is_empty());
        assert!(initial_queries(llm, "q").await.is_empty());
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_next_queries_sentinel() {
        let provider = MockProvider::new();
        provider.queue_response("  <done>\n");

        let verdict = next_queries(Llm::new(&provider, None), "q", &[], &[]).await;
        assert_eq!(verdict, PlannerVerdict::Done);
    }

    #[tokio::test]
    async fn test_next_queries_sentinel_must_be_exact() {
        let provider = MockProvider::new();
        provider.queue_response("I think we are <done>");

        let verdict = next_queries(Llm::new(&provider, None), "q", &[], &[]).await;
        assert_eq!(verdict, PlannerVerdict::Queries(vec![]));
    }

    #[tokio::test]
    async fn test_next_queries_receives_history_and_contexts() {
        let provider = MockProvider::new();
        provider.queue_response("['deeper query']");

        let history = vec!["a".to_string(), "b".to_string()];
        let contexts = vec!["first context".to_string(), "second context".to_string()];
        let verdict = next_queries(Llm::new(&provider, None), "X", &history, &contexts).await;
        assert_eq!(verdict, PlannerVerdict::Queries(vec!["deeper query".to_string()]));

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages[0].content, PLANNER_SYSTEM_PROMPT);
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("Previous Search Queries: [\"a\", \"b\"]"));
        assert!(prompt.contains("first context\nsecond context"));
    }

    #[tokio::test]
    async fn test_next_queries_unparseable_or_failed_is_empty() {
        let provider = MockProvider::new();
        provider.queue_response("['unterminated");
        provider.queue_error(deepr_core::Error::network("reset"));
        let llm = Llm::new(&provider, None);

        assert_eq!(next_queries(llm, "q", &[], &[]).await, PlannerVerdict::Queries(vec![]));
        assert_eq!(next_queries(llm, "q", &[], &[]).await, PlannerVerdict::Queries(vec![]));
        // Parsed exactly once per call, never retried.
        assert_eq!(provider.request_count(), 2);
    }
}
