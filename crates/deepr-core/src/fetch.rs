use async_trait::async_trait;

use crate::error::Error;

/// Page-fetch capability: returns the readable text of the page at `url`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_text(&self, url: &str) -> Result<String, Error>;
}
