use tracing::{info, warn};

use crate::llm::Llm;
use crate::excerpt;

pub const REPORT_SYSTEM_PROMPT: &str = "You are a skilled report writer.";

/// Report text used when synthesis yields nothing.
pub const FALLBACK_REPORT: &str = "Could not generate a final report.";

const REPORT_INSTRUCTIONS: &str = "Using the gathered contexts above and the original query, write a comprehensive, \
well-structured and detailed report that addresses the query thoroughly. Include all relevant insights and conclusions \
without extraneous commentary.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Generated(String),
    Fallback,
}

impl Report {
    pub fn text(&self) -> &str {
        match self {
            Report::Generated(text) => text,
            Report::Fallback => FALLBACK_REPORT,
        }
    }
}

/// Compose the final report from every aggregated context.
///
/// Empty `contexts` are still sent; the model is expected to decline politely.
pub async fn synthesize_report(llm: Llm<'_>, query: &str, contexts: &[String]) -> Report {
    let user = format!(
        "User Query: {}\n\nGathered Relevant Contexts:\n{}\n\n{}",
        query,
        contexts.join("\n"),
        REPORT_INSTRUCTIONS
    );

    match llm.ask("synthesize_report", REPORT_SYSTEM_PROMPT, user).await {
        Some(text) => {
            info!(chars = text.len(), preview = %excerpt(&text, 200), "Report generated");
            Report::Generated(text)
        }
        None => {
            warn!(contexts = contexts.len(), "Report synthesis failed; using fallback");
            Report::Fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepr_core::testing::MockProvider;

    #[tokio::test]
    async fn test_synthesize_report_joins_contexts() {
        let provider = MockProvider::new();
        provider.queue_response("# Report\n\nFindings.");

        let contexts = vec!["C1".to_string(), "C2".to_string()];
        let report = synthesize_report(Llm::new(&provider, None), "X", &contexts).await;
        assert_eq!(report, Report::Generated("# Report\n\nFindings.".to_string()));

        let prompt = provider.last_request().unwrap().messages[1].content.clone();
        assert!(prompt.contains("Gathered Relevant Contexts:\nC1\nC2"));
    }

    #[tokio::test]
    async fn test_synthesize_report_with_no_contexts() {
        let provider = MockProvider::new();
        provider.queue_response("Nothing relevant was found.");

        let report = synthesize_report(Llm::new(&provider, None), "X", &[]).await;
        assert_eq!(report, Report::Generated("Nothing relevant was found.".to_string()));
    }

    #[tokio::test]
    async fn test_synthesize_report_failure_falls_back() {
        let provider = MockProvider::new();
        provider.queue_error(deepr_core::Error::auth("bad key"));

        let report = synthesize_report(Llm::new(&provider, None), "X", &[]).await;
        assert_eq!(report, Report::Fallback);
        assert_eq!(report.text(), FALLBACK_REPORT);
    }
}
