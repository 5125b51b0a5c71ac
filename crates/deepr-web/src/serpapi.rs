//! Web search through the SerpApi JSON endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use deepr_core::{Error, SearchProvider};

use crate::transport_error;

pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search";
pub const DEFAULT_ENGINE: &str = "google";

pub struct SerpApiSearch {
    client: Client,
    api_key: String,
    endpoint: String,
    engine: String,
}

impl SerpApiSearch {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }
}

/// Links of `organic_results`, in rank order. Entries without a string `link`
/// are skipped; a response with no organic results has no links.
fn organic_links(body: &Value) -> Vec<String> {
    body.get("organic_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|item| item.get("link").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, Error> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", self.engine.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        let links = organic_links(&body);
        if links.is_empty() {
            debug!(query = %query, "No organic results in search response");
        }
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_organic_links_in_order() {
        let body = json!({
            "search_metadata": {"status": "Success"},
            "organic_results": [
                {"position": 1, "link": "https://a.example/one"},
                {"position": 2, "title": "no link here"},
                {"position": 3, "link": "https://b.example/two"}
            ]
        });
        assert_eq!(
            organic_links(&body),
            vec!["https://a.example/one", "https://b.example/two"]
        );
    }

    #[test]
    fn test_missing_organic_results() {
        let body = json!({"error": "Google hasn't returned any results for this query."});
        assert!(organic_links(&body).is_empty());
    }

    #[test]
    fn test_builder_overrides() {
        let search = SerpApiSearch::new(Client::new(), "key")
            .with_endpoint("http://localhost:9000/search")
            .with_engine("bing");
        assert_eq!(search.endpoint, "http://localhost:9000/search");
        assert_eq!(search.engine, "bing");
        assert_eq!(search.name(), "serpapi");
    }
}
