//! Page text through a reader endpoint that takes the target URL as a path
//! suffix (`https://r.jina.ai/<url>`) and answers with extracted text.

use async_trait::async_trait;
use reqwest::Client;

use deepr_core::{Error, PageFetcher};

use crate::transport_error;

pub const DEFAULT_BASE_URL: &str = "https://r.jina.ai/";

pub struct JinaReader {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl JinaReader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base = base_url.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = base;
        self
    }

    fn reader_url(&self, url: &str) -> String {
        format!("{}{}", self.base_url, url)
    }
}

#[async_trait]
impl PageFetcher for JinaReader {
    fn name(&self) -> &str {
        "jina"
    }

    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        let mut request = self.client.get(self.reader_url(url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), body));
        }

        response.text().await.map_err(transport_error)
    }
}
