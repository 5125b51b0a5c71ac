use tracing::{debug, warn};

use deepr_core::{CompletionRequest, Message, ModelEntry, Provider};

/// A completion capability bound to the model selection of one research run.
///
/// Every step of the run asks through the same `Llm`, so the selection is
/// passed along explicitly instead of living in shared state.
#[derive(Clone, Copy)]
pub struct Llm<'a> {
    provider: &'a dyn Provider,
    model: Option<ModelEntry>,
}

impl<'a> Llm<'a> {
    pub fn new(provider: &'a dyn Provider, model: Option<ModelEntry>) -> Self {
        Self { provider, model }
    }

    /// Send a system + user exchange and return the reply text.
    ///
    /// Transport failures and empty replies are logged and come back as `None`.
    pub async fn ask(&self, purpose: &'static str, system: &str, user: String) -> Option<String> {
        let mut request = CompletionRequest::new(vec![Message::system(system), Message::user(user)]);
        if let Some(model) = self.model {
            request = request.with_model(model.id);
        }

        match self.provider.complete(request).await {
            Ok(response) => {
                let text = response.message.content;
                if text.trim().is_empty() {
                    warn!(purpose, provider = self.provider.name(), "Completion returned no text");
                    return None;
                }
                debug!(
                    purpose,
                    model = %response.model,
                    completion_tokens = response.usage.completion_tokens,
                    "Completion succeeded"
                );
                Some(text)
            }
            Err(e) => {
                warn!(
                    purpose,
                    provider = self.provider.name(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Completion failed"
                );
                None
            }
        }
    }
}
