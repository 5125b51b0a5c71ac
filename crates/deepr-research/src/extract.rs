use tracing::debug;

use crate::llm::Llm;
use crate::{excerpt, PAGE_CHAR_LIMIT};

pub const EXTRACT_SYSTEM_PROMPT: &str =
    "You are an expert in extracting and summarizing relevant information.";

const EXTRACT_INSTRUCTIONS: &str = "Using the query, the search query that led to this page and the webpage content, \
extract every piece of information that helps answer the query. Return only that context as plain text, without commentary.";

/// Pull query-relevant text out of a page judged useful.
///
/// `None` when the completion fails or yields only whitespace.
pub async fn extract_context(
    llm: Llm<'_>,
    query: &str,
    search_query: &str,
    page: &str,
) -> Option<String> {
    let user = format!(
        "User Query: {}\nSearch Query: {}\n\nWebpage Content (first {} characters):\n{}\n\n{}",
        query,
        search_query,
        PAGE_CHAR_LIMIT,
        excerpt(page, PAGE_CHAR_LIMIT),
        EXTRACT_INSTRUCTIONS
    );

    let context = llm
        .ask("extract_context", EXTRACT_SYSTEM_PROMPT, user)
        .await?
        .trim()
        .to_string();
    debug!(chars = context.len(), preview = %excerpt(&context, 200), "Extracted context");
    Some(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepr_core::testing::MockProvider;

    #[tokio::test]
    async fn test_extract_context_trims_reply() {
        let provider = MockProvider::new();
        provider.queue_response("\n  Tokio uses a work-stealing scheduler.  \n");

        let context = extract_context(
            Llm::new(&provider, None),
            "async rust",
            "tokio scheduler",
            "page text",
        )
        .await;
        assert_eq!(context.as_deref(), Some("Tokio uses a work-stealing scheduler."));

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages[0].content, EXTRACT_SYSTEM_PROMPT);
        assert!(request.messages[1]
            .content
            .contains("User Query: async rust\nSearch Query: tokio scheduler"));
    }

    #[tokio::test]
    async fn test_extract_context_empty_is_none() {
        let provider = MockProvider::new();
        provider.queue_response("   ");
        provider.queue_error(deepr_core::Error::api(500, "boom"));
        let llm = Llm::new(&provider, None);

        assert_eq!(extract_context(llm, "q", "s", "page").await, None);
        assert_eq!(extract_context(llm, "q", "s", "page").await, None);
    }
}
